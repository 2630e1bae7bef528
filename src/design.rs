//! The design the agent simulates.

use super::*;
use crate::sim::{BinOp, Circuit, Expr};

/// The name of the clock input of [`top`].
pub const CLOCK: &str = "top.clk";

/// Builds the toplevel:
///
/// ```text
/// mod Top {
///     incoming clk of Word<1>;
///     mod counter of Counter;
///     reg toggle of Word<1> reset 0w1;
///     outgoing led of Word<1>;
///     toggle <= toggle ^ counter.carry;
///     led := counter.out[7];
/// }
///
/// mod Counter {
///     reg count of Word<8> reset 0w8;
///     outgoing out of Word<8>;
///     outgoing carry of Word<1>;
///     count <= count + 1w8;
///     out := count;
///     carry := count == 255w8;
/// }
/// ```
pub fn top() -> Circuit {
    let mut circuit = Circuit::new("Top");
    let clk = circuit.add_input(CLOCK, 1);

    circuit.add_mod("top.counter", "Counter");
    let count = circuit.add_register("top.counter.count", 8, clk, Some(Value::Word(8, 0)));
    let out = circuit.add_output("top.counter.out", 8);
    let carry = circuit.add_output("top.counter.carry", 1);
    circuit.latch(count, Expr::binop(BinOp::Add, Expr::net(count), Expr::word(8, 1)));
    circuit.connect(out, Expr::net(count));
    circuit.connect(carry, Expr::binop(BinOp::Eq, Expr::net(count), Expr::word(8, 255)));

    let toggle = circuit.add_register("top.toggle", 1, clk, Some(Value::Word(1, 0)));
    let led = circuit.add_output("top.led", 1);
    circuit.latch(toggle, Expr::binop(BinOp::Xor, Expr::net(toggle), Expr::net(carry)));
    circuit.connect(led, Expr::idx(Expr::net(out), 7));

    circuit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Sim;

    #[test]
    fn top_is_well_formed() {
        assert_eq!(top().check(), Ok(()));
    }

    #[test]
    fn top_counts_and_toggles() {
        let mut sim = Sim::new(top());
        assert_eq!(sim.peek("top.counter.count").unwrap(), Value::Word(8, 0));
        assert_eq!(sim.peek("top.led").unwrap(), false.into());

        for _ in 0..128 {
            sim.poke(CLOCK, false.into()).unwrap();
            sim.eval();
            sim.poke(CLOCK, true.into()).unwrap();
            sim.eval();
        }
        assert_eq!(sim.peek("top.counter.out").unwrap(), Value::Word(8, 128));
        assert_eq!(sim.peek("top.led").unwrap(), true.into());
        assert_eq!(sim.peek("top.toggle").unwrap(), false.into());

        for _ in 0..128 {
            sim.poke(CLOCK, false.into()).unwrap();
            sim.eval();
            sim.poke(CLOCK, true.into()).unwrap();
            sim.eval();
        }
        assert_eq!(sim.peek("top.counter.out").unwrap(), Value::Word(8, 0));
        assert_eq!(sim.peek("top.toggle").unwrap(), true.into());
    }
}
