use crate::error::ParseTimeError;

const FEMTOS_PER_SEC: u128 = 1_000_000_000_000_000;

const UNITS: [(&str, u128); 6] = [
    ("s", 1_000_000_000_000_000),
    ("ms", 1_000_000_000_000),
    ("us", 1_000_000_000),
    ("ns", 1_000_000),
    ("ps", 1_000),
    ("fs", 1),
];

/// A point on the simulation timeline, in femtoseconds since time zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimePoint(u128);

/// A span of simulation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeDelta(u128);

impl TimePoint {
    pub const ZERO: TimePoint = TimePoint(0);

    pub fn new(secs: u64, femtos: u64) -> TimePoint {
        TimePoint(secs as u128 * FEMTOS_PER_SEC + femtos as u128)
    }

    pub fn from_femtos(femtos: u128) -> TimePoint {
        TimePoint(femtos)
    }

    pub fn femtos(&self) -> u128 {
        self.0
    }

    pub fn secs(&self) -> u64 {
        (self.0 / FEMTOS_PER_SEC) as u64
    }

    pub fn subsec_femtos(&self) -> u64 {
        (self.0 % FEMTOS_PER_SEC) as u64
    }

    /// The wire form used by the debug protocol: `<secs>.<femtos>`, femtos padded to 15 digits.
    pub fn to_wire(&self) -> String {
        format!("{}.{:015}", self.secs(), self.subsec_femtos())
    }

    pub fn from_wire(text: &str) -> Result<TimePoint, ParseTimeError> {
        let invalid = || ParseTimeError(text.to_string());
        let (secs, femtos) = text.split_once('.').ok_or_else(invalid)?;
        if secs.is_empty() || femtos.is_empty() || femtos.len() > 15 {
            return Err(invalid());
        }
        if !secs.bytes().chain(femtos.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let secs: u64 = secs.parse().map_err(|_| invalid())?;
        // "1.5" means half a second, not five femtoseconds.
        let femtos: u64 = format!("{femtos:0<15}").parse().map_err(|_| invalid())?;
        Ok(TimePoint::new(secs, femtos))
    }

    pub fn checked_sub(&self, delta: TimeDelta) -> Option<TimePoint> {
        self.0.checked_sub(delta.0).map(TimePoint)
    }
}

impl TimeDelta {
    pub const ZERO: TimeDelta = TimeDelta(0);

    pub fn fs(n: u64) -> TimeDelta { TimeDelta(n as u128) }
    pub fn ps(n: u64) -> TimeDelta { TimeDelta(n as u128 * 1_000) }
    pub fn ns(n: u64) -> TimeDelta { TimeDelta(n as u128 * 1_000_000) }
    pub fn us(n: u64) -> TimeDelta { TimeDelta(n as u128 * 1_000_000_000) }
    pub fn ms(n: u64) -> TimeDelta { TimeDelta(n as u128 * 1_000_000_000_000) }
    pub fn s(n: u64) -> TimeDelta { TimeDelta(n as u128 * FEMTOS_PER_SEC) }

    pub fn femtos(&self) -> u128 {
        self.0
    }
}

impl std::ops::Add<TimeDelta> for TimePoint {
    type Output = TimePoint;

    fn add(self, delta: TimeDelta) -> TimePoint {
        TimePoint(self.0 + delta.0)
    }
}

impl std::ops::AddAssign<TimeDelta> for TimePoint {
    fn add_assign(&mut self, delta: TimeDelta) {
        self.0 += delta.0;
    }
}

impl std::ops::Sub<TimePoint> for TimePoint {
    type Output = TimeDelta;

    fn sub(self, earlier: TimePoint) -> TimeDelta {
        TimeDelta(self.0.saturating_sub(earlier.0))
    }
}

fn group_thousands(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut groups = vec![];
    while n != 0 {
        groups.push(n % 1000);
        n /= 1000;
    }
    groups
        .iter()
        .rev()
        .enumerate()
        .map(|(i, group)| if i == 0 { format!("{group}") } else { format!("{group:03}") })
        .collect::<Vec<_>>()
        .join(",")
}

fn fmt_femtos(femtos: u128, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let (suffix, scale) = UNITS
        .iter()
        .find(|(_suffix, scale)| femtos % scale == 0)
        .unwrap_or(&("fs", 1));
    write!(f, "{}{suffix}", group_thousands(femtos / scale))
}

impl std::fmt::Display for TimePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_femtos(self.0, f)
    }
}

impl std::fmt::Display for TimeDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_femtos(self.0, f)
    }
}

/// Accepts either the wire form (`0.000000001000000`) or the human form (`1,000ns`, `3 us`).
impl std::str::FromStr for TimePoint {
    type Err = ParseTimeError;

    fn from_str(text: &str) -> Result<TimePoint, ParseTimeError> {
        if text.contains('.') {
            return TimePoint::from_wire(text);
        }
        let invalid = || ParseTimeError(text.to_string());
        let split = text.find(|c: char| !c.is_ascii_digit() && c != ',').ok_or_else(invalid)?;
        let (mantissa, unit) = text.split_at(split);
        let mantissa: u128 = mantissa.replace(',', "").parse().map_err(|_| invalid())?;
        let scale = UNITS
            .iter()
            .find(|(suffix, _scale)| *suffix == unit.trim_start())
            .map(|(_suffix, scale)| *scale)
            .ok_or_else(invalid)?;
        mantissa.checked_mul(scale).map(TimePoint).ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        assert_eq!(TimePoint::ZERO.to_wire(), "0.000000000000000");
        assert_eq!((TimePoint::ZERO + TimeDelta::ns(3)).to_wire(), "0.000000003000000");
        assert_eq!(TimePoint::new(2, 1).to_wire(), "2.000000000000001");

        assert_eq!(TimePoint::from_wire("0.000000003000000").unwrap(), TimePoint::ZERO + TimeDelta::ns(3));
        assert_eq!(TimePoint::from_wire("1.5").unwrap(), TimePoint::ZERO + TimeDelta::ms(500));
        assert!(TimePoint::from_wire("1").is_err());
        assert!(TimePoint::from_wire(".5").is_err());
        assert!(TimePoint::from_wire("1.-5").is_err());
        assert!(TimePoint::from_wire("0.0000000000000001").is_err());
    }

    #[test]
    fn human_format() {
        assert_eq!(TimePoint::ZERO.to_string(), "0s");
        assert_eq!((TimePoint::ZERO + TimeDelta::ns(1)).to_string(), "1ns");
        assert_eq!((TimePoint::ZERO + TimeDelta::ns(1500)).to_string(), "1,500ns");
        assert_eq!((TimePoint::ZERO + TimeDelta::fs(1_234_567)).to_string(), "1,234,567fs");
        assert_eq!(TimeDelta::s(2).to_string(), "2s");

        assert_eq!("1,500ns".parse::<TimePoint>().unwrap(), TimePoint::ZERO + TimeDelta::ns(1500));
        assert_eq!("3 us".parse::<TimePoint>().unwrap(), TimePoint::ZERO + TimeDelta::us(3));
        assert!("3 minutes".parse::<TimePoint>().is_err());
        assert!("ns".parse::<TimePoint>().is_err());
    }

    #[test]
    fn arithmetic() {
        let t = TimePoint::ZERO + TimeDelta::ns(2);
        assert_eq!(t - TimePoint::ZERO, TimeDelta::ns(2));
        assert_eq!(t.checked_sub(TimeDelta::fs(1)), Some(TimePoint::from_femtos(1_999_999)));
        assert_eq!(TimePoint::ZERO.checked_sub(TimeDelta::fs(1)), None);

        let mut u = TimePoint::ZERO;
        u += TimeDelta::ns(1);
        assert!(u > TimePoint::ZERO);
    }
}
