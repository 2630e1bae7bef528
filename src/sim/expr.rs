use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Eq,
    Neq,
    Lt,
}

/// A combinational expression over nets.
#[derive(Debug, Clone)]
pub enum Expr {
    Net(NetId),
    Lit(Value),
    Not(Arc<Expr>),
    BinOp(BinOp, Arc<Expr>, Arc<Expr>),
    Mux(Arc<Expr>, Arc<Expr>, Arc<Expr>),
    Idx(Arc<Expr>, u64),
    /// `e[j..i]`: bits `i` (inclusive) up to `j` (exclusive).
    IdxRange(Arc<Expr>, u64, u64),
    /// Concatenation, most significant operand first.
    Cat(Vec<Arc<Expr>>),
}

impl Expr {
    pub fn net(net_id: NetId) -> Arc<Expr> {
        Arc::new(Expr::Net(net_id))
    }

    pub fn word(width: Width, n: u64) -> Arc<Expr> {
        Arc::new(Expr::Lit(Value::word(width, n)))
    }

    pub fn not(e: Arc<Expr>) -> Arc<Expr> {
        Arc::new(Expr::Not(e))
    }

    pub fn binop(op: BinOp, e1: Arc<Expr>, e2: Arc<Expr>) -> Arc<Expr> {
        Arc::new(Expr::BinOp(op, e1, e2))
    }

    pub fn mux(cond: Arc<Expr>, e1: Arc<Expr>, e2: Arc<Expr>) -> Arc<Expr> {
        Arc::new(Expr::Mux(cond, e1, e2))
    }

    pub fn idx(e: Arc<Expr>, i: u64) -> Arc<Expr> {
        Arc::new(Expr::Idx(e, i))
    }

    pub fn idx_range(e: Arc<Expr>, j: u64, i: u64) -> Arc<Expr> {
        Arc::new(Expr::IdxRange(e, j, i))
    }

    pub fn cat(es: Vec<Arc<Expr>>) -> Arc<Expr> {
        Arc::new(Expr::Cat(es))
    }

    pub fn depends_on_net(&self, net_id: NetId) -> bool {
        match self {
            Expr::Net(other) => *other == net_id,
            Expr::Lit(_value) => false,
            Expr::Not(e) => e.depends_on_net(net_id),
            Expr::BinOp(_op, e1, e2) => e1.depends_on_net(net_id) || e2.depends_on_net(net_id),
            Expr::Mux(cond, e1, e2) => {
                cond.depends_on_net(net_id) || e1.depends_on_net(net_id) || e2.depends_on_net(net_id)
            },
            Expr::Idx(e, _i) => e.depends_on_net(net_id),
            Expr::IdxRange(e, _j, _i) => e.depends_on_net(net_id),
            Expr::Cat(es) => es.iter().any(|e| e.depends_on_net(net_id)),
        }
    }

    pub fn eval(&self, sim: &Sim) -> Value {
        match self {
            Expr::Net(net_id) => sim.peek_net(*net_id),
            Expr::Lit(value) => *value,
            Expr::Not(e) => {
                match e.eval(sim) {
                    Value::Word(n, v) => Value::word(n, !v),
                    Value::X => Value::X,
                }
            },
            Expr::BinOp(op, e1, e2) => {
                let (Value::Word(w, a), Value::Word(_v, b)) = (e1.eval(sim), e2.eval(sim)) else {
                    return Value::X;
                };
                match op {
                    BinOp::Add => Value::word(w, a.wrapping_add(b)),
                    BinOp::Sub => Value::word(w, a.wrapping_sub(b)),
                    BinOp::And => Value::word(w, a & b),
                    BinOp::Or => Value::word(w, a | b),
                    BinOp::Xor => Value::word(w, a ^ b),
                    BinOp::Eq => (a == b).into(),
                    BinOp::Neq => (a != b).into(),
                    BinOp::Lt => (a < b).into(),
                }
            },
            Expr::Mux(cond, e1, e2) => {
                match cond.eval(sim) {
                    Value::Word(1, 1) => e1.eval(sim),
                    Value::Word(1, 0) => e2.eval(sim),
                    _ => Value::X,
                }
            },
            Expr::Idx(e, i) => {
                match e.eval(sim) {
                    Value::Word(width, val) if *i < width => Value::Word(1, (val >> i) & 1),
                    _ => Value::X,
                }
            },
            Expr::IdxRange(e, j, i) => {
                match e.eval(sim) {
                    Value::Word(width, val) if width >= *j && *j > *i => Value::word(j - i, val >> i),
                    _ => Value::X,
                }
            },
            Expr::Cat(es) => {
                let mut cat_width: u64 = 0;
                let mut cat_val: u64 = 0;
                for v in es.iter().rev().map(|e| e.eval(sim)) {
                    match v {
                        Value::Word(width, val) if cat_width + width <= 64 => {
                            if cat_width < 64 {
                                cat_val |= val << cat_width;
                            }
                            cat_width += width;
                        },
                        _ => return Value::X,
                    }
                }
                Value::word(cat_width, cat_val)
            },
        }
    }
}
