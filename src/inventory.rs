use super::*;
use crate::sim::{Circuit, NetId, NetKind};

use std::collections::BTreeMap;

/// A net a debugger can observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub identifier: String,
    pub net_id: NetId,
    pub width: Width,
    pub input: bool,
    pub output: bool,
}

impl Item {
    pub fn settable(&self) -> bool {
        self.input
    }

    /// The identifier of the scope the item lives in.
    pub fn scope(&self) -> &str {
        self.identifier.rsplit_once(' ').map(|(scope, _name)| scope).unwrap_or("")
    }
}

/// A module instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub identifier: String,
    pub name: Option<String>,
}

/// Everything in a circuit that is visible to a debugger.
///
/// Items are ordered by identifier, and an item's position in that order is its index in the spool.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    items: Vec<Item>,
    index_by_identifier: BTreeMap<String, usize>,
    scopes: BTreeMap<String, Scope>,
}

impl Inventory {
    pub fn new(circuit: &Circuit) -> Inventory {
        let mut items: Vec<Item> = circuit
            .nets
            .iter()
            .enumerate()
            .filter(|(_net_id, net)| net.kind != NetKind::RegSet)
            .map(|(net_id, net)| Item {
                identifier: net.path.to_identifier(),
                net_id,
                width: net.width,
                input: net.kind == NetKind::Input,
                output: net.kind == NetKind::Output,
            })
            .collect();
        items.sort_by(|a, b| a.identifier.cmp(&b.identifier));

        let index_by_identifier = items
            .iter()
            .enumerate()
            .map(|(index, item)| (item.identifier.clone(), index))
            .collect();

        // Every ancestor of an item is a scope, even if nothing declared it as a module.
        let mut scopes: BTreeMap<String, Scope> = BTreeMap::new();
        for net in circuit.nets.iter().filter(|net| net.kind != NetKind::RegSet) {
            for ancestor in net.path.ancestors() {
                let identifier = ancestor.to_identifier();
                scopes.entry(identifier.clone()).or_insert(Scope { identifier, name: None });
            }
        }
        for (path, name) in &circuit.mods {
            let identifier = path.to_identifier();
            scopes.insert(identifier.clone(), Scope { identifier, name: Some(name.clone()) });
        }

        Inventory {
            items,
            index_by_identifier,
            scopes,
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, identifier: &str) -> Option<(usize, &Item)> {
        let index = *self.index_by_identifier.get(identifier)?;
        Some((index, &self.items[index]))
    }

    /// Items directly inside `scope`, or every item when `scope` is `None`.
    pub fn items_in(&self, scope: Option<&str>) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| scope.map(|scope| item.scope() == scope).unwrap_or(true))
            .collect()
    }

    /// `scope` and every scope nested under it, or every scope when `scope` is `None` or empty.
    pub fn scopes_in(&self, scope: Option<&str>) -> Vec<&Scope> {
        self.scopes
            .values()
            .filter(|candidate| match scope {
                None | Some("") => true,
                Some(scope) => {
                    candidate.identifier == scope || candidate.identifier.starts_with(&format!("{scope} "))
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_of_top() {
        let inventory = Inventory::new(&crate::design::top());
        let identifiers: Vec<&str> = inventory.items().iter().map(|item| item.identifier.as_str()).collect();
        assert_eq!(
            identifiers,
            vec![
                "top clk",
                "top counter carry",
                "top counter count",
                "top counter out",
                "top led",
                "top toggle",
            ],
        );

        let (index, clk) = inventory.item("top clk").unwrap();
        assert_eq!(index, 0);
        assert!(clk.input && clk.settable() && !clk.output);
        assert_eq!(clk.scope(), "top");
        assert!(inventory.item("top counter count.set").is_none());

        let in_counter: Vec<&str> = inventory
            .items_in(Some("top counter"))
            .iter()
            .map(|item| item.identifier.as_str())
            .collect();
        assert_eq!(in_counter, vec!["top counter carry", "top counter count", "top counter out"]);
        assert_eq!(inventory.items_in(None).len(), 6);

        let scopes: Vec<(&str, Option<&str>)> = inventory
            .scopes_in(None)
            .iter()
            .map(|scope| (scope.identifier.as_str(), scope.name.as_deref()))
            .collect();
        assert_eq!(scopes, vec![("top", Some("Top")), ("top counter", Some("Counter"))]);
        assert_eq!(inventory.scopes_in(Some("top counter")).len(), 1);
        assert_eq!(inventory.scopes_in(Some("top")).len(), 2);
        assert!(inventory.scopes_in(Some("bottom")).is_empty());
    }
}
