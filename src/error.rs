use super::*;

use std::path::PathBuf;

/// Everything that can stop the agent.
///
/// `Usage` is the only recoverable one: the caller fixes the invocation.
/// The rest are fatal and propagate to the process exit.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Usage: {0}")]
    Usage(String),
    #[error("Couldn't open spool {}: {source}", path.display())]
    Spool { path: PathBuf, source: std::io::Error },
    #[error("Couldn't write to spool: {0}")]
    SpoolWrite(#[source] std::io::Error),
    #[error("Couldn't bind debug endpoint on {address}: {source}")]
    Bind { address: String, source: std::io::Error },
    #[error("Simulation error: {0}")]
    Sim(#[from] SimError),
}

/// Misuse of a [`crate::sim::Sim`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("No such net: {0}")]
    NoSuchNet(Path),
    #[error("Not settable: {0} is not an input")]
    NotSettable(Path),
    #[error("Width mismatch: {path} is {expected} bits wide but got {value:?}")]
    WidthMismatch { path: Path, expected: Width, value: Value },
}

/// A structural problem found by [`crate::sim::Circuit::check`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitError {
    #[error("Component has multiple drivers: {0}")]
    MultipleDrivers(Path),
    #[error("Component is not driven: {0}")]
    NoDrivers(Path),
    #[error("Incoming port is being driven, but shouldn't be: {0}")]
    IncomingPortDriven(Path),
    #[error("Wrong wire type: {0} is a register and only supports <=")]
    WrongWireType(Path),
    #[error("Register is clocked by a net wider than one bit: {0}")]
    BadClock(Path),
}

/// Failures while reading back a spool.
#[derive(Debug, thiserror::Error)]
pub enum SpoolError {
    #[error("I/O error reading spool: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a spool file")]
    BadMagic,
    #[error("Corrupt spool record at offset {0}")]
    Corrupt(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Not a valid time point: {0:?}")]
pub struct ParseTimeError(pub String);
