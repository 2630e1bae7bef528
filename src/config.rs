use super::*;

use std::net::SocketAddr;
use std::path::PathBuf;

pub const SPOOL_PATH: &str = "spool.bin";
pub const DEBUG_ADDRESS: &str = "127.0.0.1:6618";

/// How the debug endpoint is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Listen for TCP connections on the given address. Port 0 picks a free port.
    Tcp(String),
}

impl Transport {
    pub fn address(&self) -> &str {
        match self {
            Transport::Tcp(address) => address,
        }
    }

    /// The URI clients connect to once the endpoint is bound to `local`.
    pub fn uri(&self, local: SocketAddr) -> String {
        match self {
            Transport::Tcp(_address) if local.ip().is_loopback() => {
                format!("cxxrtl+tcp://localhost:{}", local.port())
            },
            Transport::Tcp(_address) => format!("cxxrtl+tcp://{local}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub spool_path: PathBuf,
    pub transport: Transport,
    /// Simulated time between two half-cycles of the clock.
    pub quantum: TimeDelta,
    pub clock: String,
    /// Whether steps after the first wait for a client to run the simulation.
    pub start_paused: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            spool_path: PathBuf::from(SPOOL_PATH),
            transport: Transport::Tcp(DEBUG_ADDRESS.to_string()),
            quantum: TimeDelta::ns(1),
            clock: design::CLOCK.to_string(),
            start_paused: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uris() {
        let transport = Config::default().transport;
        assert_eq!(transport.address(), "127.0.0.1:6618");
        assert_eq!(transport.uri("127.0.0.1:6618".parse().unwrap()), "cxxrtl+tcp://localhost:6618");
        assert_eq!(transport.uri("10.0.0.7:9000".parse().unwrap()), "cxxrtl+tcp://10.0.0.7:9000");
    }
}
