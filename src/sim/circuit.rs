use super::*;

use std::collections::BTreeMap;

pub type NetId = usize;
pub type RegId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetKind {
    Input,
    Output,
    Node,
    Reg,
    /// The next-value terminal of a register, `r.set`.
    RegSet,
}

#[derive(Debug, Clone)]
pub struct NetInfo {
    pub path: Path,
    pub width: Width,
    pub kind: NetKind,
}

#[derive(Debug, Clone)]
pub struct Comb(pub NetId, pub Arc<Expr>);

impl Comb {
    pub fn depends_on(&self, net_id: NetId) -> bool {
        let Comb(_net_id, expr) = self;
        expr.depends_on_net(net_id)
    }
}

#[derive(Debug, Clone)]
pub struct RegInfo {
    pub set_net_id: NetId,
    pub val_net_id: NetId,
    pub clock_net_id: NetId,
    pub reset: Option<Value>,
}

/// A flattened design: nets, the combinational drivers between them, and registers.
///
/// Every terminal is its own net. A register `r` owns two nets: `r` holds its current value and
/// `r.set` is driven with the value latched on the next rising edge of its clock.
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    pub nets: Vec<NetInfo>, // indexed by NetId
    pub combs: Vec<Comb>,
    pub regs: Vec<RegInfo>, // indexed by RegId
    pub mods: BTreeMap<Path, String>,
    net_id_by_path: BTreeMap<Path, NetId>,
}

impl Circuit {
    /// A circuit whose toplevel module, `top`, is an instance of `name`.
    pub fn new(name: &str) -> Circuit {
        let mut circuit = Circuit::default();
        circuit.add_mod("top", name);
        circuit
    }

    pub fn add_mod<P: Into<Path>>(&mut self, path: P, name: &str) {
        self.mods.insert(path.into(), name.to_string());
    }

    fn add_net(&mut self, path: Path, width: Width, kind: NetKind) -> NetId {
        let net_id = self.nets.len();
        self.net_id_by_path.insert(path.clone(), net_id);
        self.nets.push(NetInfo { path, width, kind });
        net_id
    }

    pub fn add_input<P: Into<Path>>(&mut self, path: P, width: Width) -> NetId {
        self.add_net(path.into(), width, NetKind::Input)
    }

    pub fn add_output<P: Into<Path>>(&mut self, path: P, width: Width) -> NetId {
        self.add_net(path.into(), width, NetKind::Output)
    }

    pub fn add_node<P: Into<Path>>(&mut self, path: P, width: Width) -> NetId {
        self.add_net(path.into(), width, NetKind::Node)
    }

    /// Adds a register clocked by the rising edge of `clock`. Returns the net of its current value.
    pub fn add_register<P: Into<Path>>(&mut self, path: P, width: Width, clock: NetId, reset: Option<Value>) -> NetId {
        let path: Path = path.into();
        let val_net_id = self.add_net(path.clone(), width, NetKind::Reg);
        let set_net_id = self.add_net(path.set(), width, NetKind::RegSet);
        self.regs.push(RegInfo {
            set_net_id,
            val_net_id,
            clock_net_id: clock,
            reset,
        });
        val_net_id
    }

    /// Drives `terminal` with `expr` (`terminal := expr`).
    pub fn connect(&mut self, terminal: NetId, expr: Arc<Expr>) {
        self.combs.push(Comb(terminal, expr));
    }

    /// Drives the next value of the register whose value net is `reg` (`reg <= expr`).
    pub fn latch(&mut self, reg: NetId, expr: Arc<Expr>) {
        let set_net_id = self
            .regs
            .iter()
            .find(|reginfo| reginfo.val_net_id == reg)
            .map(|reginfo| reginfo.set_net_id)
            .unwrap_or(reg);
        self.combs.push(Comb(set_net_id, expr));
    }

    pub fn net_id(&self, path: &Path) -> Option<NetId> {
        self.net_id_by_path.get(path).copied()
    }

    pub fn net_ids(&self) -> Vec<NetId> {
        (0..self.nets.len()).collect()
    }

    pub fn check(&self) -> Result<(), Vec<CircuitError>> {
        let mut errors = vec![];
        let mut drivers = vec![0usize; self.nets.len()];
        for Comb(target, _expr) in &self.combs {
            drivers[*target] += 1;
        }

        for (net_id, net) in self.nets.iter().enumerate() {
            match (net.kind, drivers[net_id]) {
                (NetKind::Input, 0) => (),
                (NetKind::Input, _) => errors.push(CircuitError::IncomingPortDriven(net.path.clone())),
                (NetKind::Reg, 0) => (),
                (NetKind::Reg, _) => errors.push(CircuitError::WrongWireType(net.path.clone())),
                (_, 0) => errors.push(CircuitError::NoDrivers(net.path.clone())),
                (_, 1) => (),
                (_, _) => errors.push(CircuitError::MultipleDrivers(net.path.clone())),
            }
        }

        for reginfo in &self.regs {
            if self.nets[reginfo.clock_net_id].width != 1 {
                errors.push(CircuitError::BadClock(self.nets[reginfo.val_net_id].path.clone()));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
