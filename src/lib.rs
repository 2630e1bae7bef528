//! Runs a Bitsy design on a free-running clock, records everything it does into a spool, and
//! serves the recording to waveform debuggers while the simulation keeps going.

pub mod time;
pub mod error;
pub mod path;
pub mod sim;
pub mod design;
pub mod inventory;
pub mod spool;
pub mod proto;
pub mod link;
pub mod server;
pub mod agent;
pub mod harness;
pub mod config;
pub mod logging;

pub use time::{TimeDelta, TimePoint};
pub use error::{AgentError, CircuitError, ParseTimeError, SimError, SpoolError};
pub use path::Path;
pub use sim::{Value, Width};
pub use inventory::{Inventory, Item, Scope};
pub use config::{Config, Transport};
pub use agent::{Agent, AgentEngine};
pub use harness::{Engine, Harness};
