pub type Width = u64;

/// A value carried by a net in the simulator (see [`crate::sim::Sim`]).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Value {
    /// An undefined value.
    #[default]
    X,
    /// An element of `Word<n>`.
    Word(Width, u64),
}

fn mask(width: Width) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}

impl Value {
    /// A word of the given width, with any bits above the width cleared.
    pub fn word(width: Width, n: u64) -> Value {
        Value::Word(width, n & mask(width))
    }

    pub fn width(&self) -> Option<Width> {
        match self {
            Value::X => None,
            Value::Word(w, _n) => Some(*w),
        }
    }

    pub fn to_u64(&self) -> Option<u64> {
        match self {
            Value::X => None,
            Value::Word(w, n) => Some(n & mask(*w)),
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Word(1, 0) => Some(false),
            Value::Word(1, 1) => Some(true),
            _ => None,
        }
    }

    /// Splits the value into 32-bit chunks for a net of the given width, most significant chunk first.
    /// An undefined value reads as zero.
    pub fn to_u32_chunks(&self, width: Width) -> Vec<u32> {
        let n = self.to_u64().unwrap_or(0);
        let chunks = ((width + 31) / 32).max(1);
        (0..chunks)
            .rev()
            .map(|i| if i >= 2 { 0 } else { (n >> (32 * i)) as u32 })
            .collect()
    }
}

impl From<bool> for Value {
    fn from(x: bool) -> Value {
        Value::Word(1, if x { 1 } else { 0 })
    }
}

impl TryFrom<Value> for bool {
    type Error = ();
    fn try_from(value: Value) -> Result<bool, Self::Error> {
        value.to_bool().ok_or(())
    }
}

impl TryFrom<Value> for u64 {
    type Error = ();
    fn try_from(value: Value) -> Result<u64, Self::Error> {
        value.to_u64().ok_or(())
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Value::X => write!(f, "XXX"),
            Value::Word(w, n) => write!(f, "{n}w{w}"),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{self:?}")
    }
}

#[test]
fn value_to_u64() {
    let v: Value = Value::Word(4, 7);
    assert_eq!(v.to_u64(), Some(7));
    let v: Value = Value::Word(2, 7);
    assert_eq!(v.to_u64(), Some(3));
    assert_eq!(Value::word(2, 7), Value::Word(2, 3));
    assert_eq!(Value::word(64, u64::MAX).to_u64(), Some(u64::MAX));
    assert_eq!(Value::X.to_u64(), None);
}

#[test]
fn value_chunks() {
    assert_eq!(Value::Word(1, 1).to_u32_chunks(1), vec![1]);
    assert_eq!(Value::Word(40, 0x12_0000_0001).to_u32_chunks(40), vec![0x12, 1]);
    assert_eq!(Value::X.to_u32_chunks(8), vec![0]);
    assert_eq!(Value::X.to_string(), "XXX");
    assert_eq!(Value::Word(8, 255).to_string(), "255w8");
}
