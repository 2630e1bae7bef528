//! Packets of the debug protocol.
//!
//! Every packet is a JSON object followed by a NUL byte (see [`crate::link`]). The client opens with
//! a greeting, then sends commands; the server answers each command, in order, with a response or
//! an error, and may send events at any time after the greeting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const VERSION: u64 = 0;

pub const ITEM_VALUES_ENCODING: &str = "base64(u32)";

pub const COMMANDS: [&str; 7] = [
    "list_scopes",
    "list_items",
    "reference_items",
    "query_interval",
    "get_simulation_status",
    "run_simulation",
    "pause_simulation",
];

pub const EVENTS: [&str; 1] = ["simulation_paused"];

/// Error codes carried by [`ServerPacket::Error`].
pub mod errors {
    pub const INVALID_PACKET: &str = "invalid_packet";
    pub const PROTOCOL_ERROR: &str = "protocol_error";
    pub const INVALID_COMMAND: &str = "invalid_command";
    pub const INVALID_ARGUMENT: &str = "invalid_argument";
    pub const INVALID_REFERENCE: &str = "invalid_reference";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientPacket {
    Greeting { version: u64 },
    Command(Command),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    ListScopes {
        #[serde(default)]
        scope: Option<String>,
    },
    ListItems {
        #[serde(default)]
        scope: Option<String>,
    },
    ReferenceItems {
        reference: String,
        items: Option<Vec<ItemDesignation>>,
    },
    QueryInterval {
        interval: (String, String),
        #[serde(default)]
        collapse: bool,
        #[serde(default)]
        items: Option<String>,
        #[serde(default)]
        item_values_encoding: Option<String>,
        #[serde(default)]
        diagnostics: bool,
    },
    GetSimulationStatus {},
    RunSimulation {
        #[serde(default)]
        until_time: Option<String>,
        #[serde(default)]
        until_diagnostics: Vec<DiagnosticType>,
        #[serde(default)]
        sample_item_values: bool,
    },
    PauseSimulation {},
}

/// `[identifier]` for a node, `[identifier, first, last]` for rows of a memory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ItemDesignation {
    Node((String,)),
    MemoryRows(String, u64, u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticType {
    Break,
    Print,
    Assert,
    Assume,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerPacket {
    Greeting {
        version: u64,
        commands: Vec<String>,
        events: Vec<String>,
        features: Features,
    },
    Response(Response),
    Error {
        error: String,
        message: String,
    },
    Event(Event),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Features {
    pub item_values_encoding: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Response {
    ListScopes {
        scopes: BTreeMap<String, ScopeDescription>,
    },
    ListItems {
        items: BTreeMap<String, ItemDescription>,
    },
    ReferenceItems {},
    QueryInterval {
        samples: Vec<Sample>,
    },
    GetSimulationStatus {
        status: SimulationStatus,
        latest_time: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        next_sample_time: Option<String>,
    },
    RunSimulation {},
    PauseSimulation {
        time: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    Running,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    SimulationPaused {
        time: String,
        cause: PauseCause,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseCause {
    UntilTime,
}

pub type AttributeMap = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScopeDescription {
    Module {
        definition: Definition,
        instantiation: Instantiation,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub src: Option<String>,
    pub name: Option<String>,
    pub attributes: AttributeMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instantiation {
    pub src: Option<String>,
    pub attributes: AttributeMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemDescription {
    Node {
        src: Option<String>,
        lsb_at: u64,
        width: u64,
        input: bool,
        output: bool,
        settable: bool,
        attributes: AttributeMap,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_values: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Vec<Diagnostic>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    #[serde(rename = "type")]
    pub typ: DiagnosticType,
    pub text: String,
    pub src: Option<String>,
}

/// A packet the server can't act on, reported back as an error packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    pub error: &'static str,
    pub message: String,
}

impl ProtocolError {
    pub fn new(error: &'static str, message: impl Into<String>) -> ProtocolError {
        ProtocolError { error, message: message.into() }
    }
}

impl From<ProtocolError> for ServerPacket {
    fn from(error: ProtocolError) -> ServerPacket {
        ServerPacket::Error {
            error: error.error.to_string(),
            message: error.message,
        }
    }
}

impl ServerPacket {
    pub fn greeting() -> ServerPacket {
        ServerPacket::Greeting {
            version: VERSION,
            commands: COMMANDS.iter().map(|command| command.to_string()).collect(),
            events: EVENTS.iter().map(|event| event.to_string()).collect(),
            features: Features {
                item_values_encoding: vec![ITEM_VALUES_ENCODING.to_string()],
            },
        }
    }
}

pub fn parse_client_packet(text: &str) -> Result<ClientPacket, ProtocolError> {
    use errors::*;

    let packet: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| ProtocolError::new(INVALID_PACKET, format!("Packet is not valid JSON: {e}")))?;

    match packet.get("type").and_then(|typ| typ.as_str()) {
        Some("greeting") => {
            let version = packet
                .get("version")
                .and_then(|version| version.as_u64())
                .ok_or_else(|| ProtocolError::new(INVALID_PACKET, "Greeting has no version"))?;
            Ok(ClientPacket::Greeting { version })
        },
        Some("command") => {
            let name = packet
                .get("command")
                .and_then(|command| command.as_str())
                .ok_or_else(|| ProtocolError::new(INVALID_PACKET, "Command packet has no command"))?;
            if !COMMANDS.contains(&name) {
                return Err(ProtocolError::new(INVALID_COMMAND, format!("Unknown command: {name}")));
            }
            let name = name.to_string();
            let command: Command = serde_json::from_value(packet)
                .map_err(|e| ProtocolError::new(INVALID_ARGUMENT, format!("Invalid arguments to {name}: {e}")))?;
            Ok(ClientPacket::Command(command))
        },
        Some(other) => Err(ProtocolError::new(INVALID_PACKET, format!("Unexpected packet type: {other}"))),
        None => Err(ProtocolError::new(INVALID_PACKET, "Packet has no type")),
    }
}
