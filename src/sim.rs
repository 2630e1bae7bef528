use super::*;

#[cfg(test)]
mod tests;
mod value;
mod expr;
mod circuit;

pub use value::{Value, Width};
pub use expr::{BinOp, Expr};
pub use circuit::*;

use std::sync::Arc;

pub type CombId = usize;

/// A running instance of a [`Circuit`].
///
/// Combinational logic is kept settled at all times: every [`Sim::poke`] propagates eagerly through
/// the combs that depend on the poked net. Registers only change in [`Sim::eval`].
pub struct Sim {
    circuit: Arc<Circuit>,
    dependents: Vec<Vec<CombId>>, // indexed by NetId
    net_values: Vec<Value>,
    last_clocks: Vec<Value>, // indexed by RegId
    evals: u64,
}

fn make_dependents(circuit: &Circuit) -> Vec<Vec<CombId>> {
    circuit
        .net_ids()
        .iter()
        .map(|net_id| {
            circuit
                .combs
                .iter()
                .enumerate()
                .filter(|(_comb_id, comb)| comb.depends_on(*net_id))
                .map(|(comb_id, _comb)| comb_id)
                .collect()
        })
        .collect()
}

impl Sim {
    pub fn new(circuit: Circuit) -> Sim {
        let circuit = Arc::new(circuit);
        let dependents = make_dependents(&circuit);
        let net_values: Vec<Value> = circuit
            .nets
            .iter()
            .map(|net| match net.kind {
                NetKind::Input => Value::Word(net.width, 0),
                _ => Value::X,
            })
            .collect();

        let mut sim = Sim {
            circuit: circuit.clone(),
            dependents,
            net_values,
            last_clocks: vec![],
            evals: 0,
        };

        sim.reset();
        for Comb(target_net_id, expr) in circuit.combs.iter() {
            let value = expr.eval(&sim);
            sim.poke_net(*target_net_id, value);
        }
        sim.last_clocks = circuit.regs.iter().map(|reginfo| sim.peek_net(reginfo.clock_net_id)).collect();
        sim
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// The value of every net, indexed by [`NetId`].
    pub fn values(&self) -> &[Value] {
        &self.net_values
    }

    /// How many times [`Sim::eval`] has been called.
    pub fn evals(&self) -> u64 {
        self.evals
    }

    pub(crate) fn poke_net(&mut self, net_id: NetId, value: Value) {
        if self.net_values[net_id] == value {
            return;
        }
        self.net_values[net_id] = value;

        // update dependent nets through all combs
        let circuit = self.circuit.clone();
        for comb_id in self.dependents[net_id].clone() {
            let Comb(target_net_id, expr) = &circuit.combs[comb_id];
            let value = expr.eval(self);
            self.poke_net(*target_net_id, value);
        }
    }

    pub(crate) fn peek_net(&self, net_id: NetId) -> Value {
        self.net_values[net_id]
    }

    fn net_id(&self, path: &Path) -> Result<NetId, SimError> {
        self.circuit.net_id(path).ok_or_else(|| SimError::NoSuchNet(path.clone()))
    }

    pub fn peek<P: Into<Path>>(&self, path: P) -> Result<Value, SimError> {
        let net_id = self.net_id(&path.into())?;
        Ok(self.net_values[net_id])
    }

    /// Sets an input. Only inputs are settable; everything else is driven by the design.
    pub fn poke<P: Into<Path>>(&mut self, path: P, value: Value) -> Result<(), SimError> {
        let path: Path = path.into();
        let net_id = self.net_id(&path)?;
        let net = &self.circuit.nets[net_id];
        if net.kind != NetKind::Input {
            return Err(SimError::NotSettable(path));
        }
        if value.width() != Some(net.width) {
            return Err(SimError::WidthMismatch { path, expected: net.width, value });
        }
        self.poke_net(net_id, value);
        Ok(())
    }

    /// Puts every register with a reset value back to it.
    pub fn reset(&mut self) {
        for reginfo in &self.circuit.clone().regs {
            if let Some(reset) = reginfo.reset {
                self.poke_net(reginfo.val_net_id, reset);
            }
        }
    }

    /// Latches every register whose clock rose since the previous call, then keeps going until
    /// no further edges appear (registers clocked by other registers).
    ///
    /// Returns the number of register updates performed.
    pub fn eval(&mut self) -> usize {
        self.evals += 1;
        let circuit = self.circuit.clone();
        let mut latched = 0;

        loop {
            let mut edges: Vec<RegId> = vec![];
            for (reg_id, reginfo) in circuit.regs.iter().enumerate() {
                let clock = self.peek_net(reginfo.clock_net_id);
                if self.last_clocks[reg_id] == Value::Word(1, 0) && clock == Value::Word(1, 1) {
                    edges.push(reg_id);
                }
                self.last_clocks[reg_id] = clock;
            }

            if edges.is_empty() {
                break;
            }

            let updates: Vec<(NetId, Value)> = edges
                .iter()
                .map(|reg_id| {
                    let reginfo = &circuit.regs[*reg_id];
                    (reginfo.val_net_id, self.peek_net(reginfo.set_net_id))
                })
                .collect();
            latched += updates.len();
            for (val_net_id, value) in updates {
                self.poke_net(val_net_id, value);
            }
        }

        latched
    }
}

impl std::fmt::Debug for Sim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        for (net_id, value) in self.net_values.iter().enumerate() {
            let net = &self.circuit.nets[net_id];
            write!(f, "    {:>5}   ", format!("{value:?}"))?;
            writeln!(f, "{}", net.path)?;
        }

        Ok(())
    }
}
