use super::*;

fn buffer() -> Circuit {
    let mut circuit = Circuit::new("Top");
    let clk = circuit.add_input("top.clk", 1);
    let input = circuit.add_input("top.in", 1);
    let r = circuit.add_register("top.r", 1, clk, None);
    let out = circuit.add_output("top.out", 1);
    circuit.latch(r, Expr::net(input));
    circuit.connect(out, Expr::net(r));
    circuit
}

#[test]
fn buffer_latches_on_rising_edge() {
    let buffer = buffer();
    assert_eq!(buffer.check(), Ok(()));
    let mut bitsy = Sim::new(buffer);

    bitsy.poke("top.in", true.into()).unwrap();
    assert_eq!(bitsy.peek("top.r").unwrap(), Value::X);
    assert_eq!(bitsy.peek("top.r.set").unwrap(), true.into());
    assert_eq!(bitsy.peek("top.out").unwrap(), Value::X);

    // no edge yet
    assert_eq!(bitsy.eval(), 0);
    assert_eq!(bitsy.peek("top.out").unwrap(), Value::X);

    bitsy.poke("top.clk", true.into()).unwrap();
    assert_eq!(bitsy.eval(), 1);
    assert_eq!(bitsy.peek("top.r").unwrap(), true.into());
    assert_eq!(bitsy.peek("top.out").unwrap(), true.into());

    // falling edge and a level clock do nothing
    bitsy.poke("top.in", false.into()).unwrap();
    assert_eq!(bitsy.eval(), 0);
    bitsy.poke("top.clk", false.into()).unwrap();
    assert_eq!(bitsy.eval(), 0);
    assert_eq!(bitsy.peek("top.out").unwrap(), true.into());
    assert_eq!(bitsy.evals(), 4);
}

#[test]
fn counter() {
    let mut circuit = Circuit::new("Top");
    let clk = circuit.add_input("top.clk", 1);
    let counter = circuit.add_register("top.counter", 4, clk, Some(Value::Word(4, 0)));
    let out = circuit.add_output("top.out", 4);
    circuit.connect(out, Expr::net(counter));
    circuit.latch(counter, Expr::binop(BinOp::Add, Expr::net(counter), Expr::word(4, 1)));

    let mut bitsy = Sim::new(circuit);

    for i in 0..16 {
        assert_eq!(bitsy.peek("top.out").unwrap(), Value::Word(4, i));
        bitsy.poke("top.clk", true.into()).unwrap();
        bitsy.eval();
        bitsy.poke("top.clk", false.into()).unwrap();
        bitsy.eval();
    }
    assert_eq!(bitsy.peek("top.out").unwrap(), Value::Word(4, 0));
}

#[test]
fn derived_clock_settles_in_one_eval() {
    let mut circuit = Circuit::new("Top");
    let clk = circuit.add_input("top.clk", 1);
    let div = circuit.add_register("top.div", 1, clk, Some(false.into()));
    circuit.latch(div, Expr::not(Expr::net(div)));
    let slow = circuit.add_register("top.slow", 4, div, Some(Value::Word(4, 0)));
    circuit.latch(slow, Expr::binop(BinOp::Add, Expr::net(slow), Expr::word(4, 1)));
    assert_eq!(circuit.check(), Ok(()));

    let mut bitsy = Sim::new(circuit);
    bitsy.poke("top.clk", true.into()).unwrap();
    assert_eq!(bitsy.eval(), 2);
    assert_eq!(bitsy.peek("top.div").unwrap(), true.into());
    assert_eq!(bitsy.peek("top.slow").unwrap(), Value::Word(4, 1));

    bitsy.poke("top.clk", false.into()).unwrap();
    bitsy.eval();
    bitsy.poke("top.clk", true.into()).unwrap();
    assert_eq!(bitsy.eval(), 1);
    assert_eq!(bitsy.peek("top.div").unwrap(), false.into());
    assert_eq!(bitsy.peek("top.slow").unwrap(), Value::Word(4, 1));
}

#[test]
fn poke_rejects_non_inputs() {
    let mut bitsy = Sim::new(buffer());
    assert_eq!(bitsy.poke("top.out", true.into()), Err(SimError::NotSettable("top.out".into())));
    assert_eq!(bitsy.poke("top.nope", true.into()), Err(SimError::NoSuchNet("top.nope".into())));
    assert!(matches!(bitsy.poke("top.in", Value::Word(2, 0)), Err(SimError::WidthMismatch { .. })));
    assert!(matches!(bitsy.poke("top.in", Value::X), Err(SimError::WidthMismatch { .. })));
}

#[test]
fn check_finds_bad_wiring() {
    let mut circuit = Circuit::new("Top");
    let input = circuit.add_input("top.in", 1);
    let a = circuit.add_node("top.a", 1);
    let _b = circuit.add_node("top.b", 1);
    circuit.connect(input, Expr::word(1, 0));
    circuit.connect(a, Expr::word(1, 0));
    circuit.connect(a, Expr::word(1, 1));

    let errors = circuit.check().unwrap_err();
    assert_eq!(
        errors,
        vec![
            CircuitError::IncomingPortDriven("top.in".into()),
            CircuitError::MultipleDrivers("top.a".into()),
            CircuitError::NoDrivers("top.b".into()),
        ],
    );
}

#[test]
fn test_eval() {
    let mut circuit = Circuit::new("Top");
    let a = circuit.add_input("top.a", 4);
    let b = circuit.add_input("top.b", 4);
    let x = circuit.add_input("top.x", 1);

    let tests = vec![
        (Expr::word(8, 1), Value::Word(8, 1)),
        (Expr::binop(BinOp::Add, Expr::net(a), Expr::net(b)), Value::Word(4, 5)),
        (Expr::binop(BinOp::Sub, Expr::net(a), Expr::net(b)), Value::Word(4, 15)),
        (Expr::binop(BinOp::Add, Expr::word(1, 1), Expr::word(1, 1)), Value::Word(1, 0)),
        (Expr::binop(BinOp::Eq, Expr::net(a), Expr::net(b)), false.into()),
        (Expr::binop(BinOp::Neq, Expr::net(a), Expr::net(b)), true.into()),
        (Expr::binop(BinOp::Lt, Expr::net(a), Expr::net(b)), true.into()),
        (Expr::binop(BinOp::Xor, Expr::net(a), Expr::net(b)), Value::Word(4, 0b0001)),
        (Expr::not(Expr::net(x)), false.into()),
        (Expr::cat(vec![Expr::word(1, 1), Expr::word(1, 1)]), Value::Word(2, 0b11)),
        (Expr::cat(vec![Expr::net(x), Expr::net(a)]), Value::Word(5, 0b10010)),
        (Expr::idx_range(Expr::word(4, 3), 3, 1), Value::Word(2, 0b01)),
        (Expr::idx_range(Expr::word(4, 6), 4, 1), Value::Word(3, 0b11)),
        (Expr::idx(Expr::word(4, 7), 3), Value::Word(1, 0)),
        (Expr::idx(Expr::word(4, 7), 2), Value::Word(1, 1)),
        (Expr::idx(Expr::word(4, 7), 4), Value::X),
        (Expr::mux(Expr::net(x), Expr::net(a), Expr::net(b)), Value::Word(4, 2)),
        (Expr::mux(Expr::not(Expr::net(x)), Expr::net(a), Expr::net(b)), Value::Word(4, 3)),
        (Expr::binop(BinOp::Add, Expr::word(4, 1), Arc::new(Expr::Lit(Value::X))), Value::X),
    ];

    let mut bitsy = Sim::new(circuit);
    bitsy.poke("top.a", Value::Word(4, 2)).unwrap();
    bitsy.poke("top.b", Value::Word(4, 3)).unwrap();
    bitsy.poke("top.x", true.into()).unwrap();

    for (expr, v) in tests {
        assert_eq!(expr.eval(&bitsy), v, "{expr:?} does not equal {v:?}");
    }
}
