//! The debug server: run control shared with the simulation thread, and one session per client.

use super::*;
use crate::link::{self, PacketReader};
use crate::proto;
use crate::proto::errors::*;
use crate::proto::{ClientPacket, Command, Event, ItemDesignation, PauseCause, ProtocolError, Response, ServerPacket};
use crate::spool::{Recorded, Replayer, SpoolIndex};

use base64::Engine as _;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use log::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Paused,
    /// Running, optionally up to and including a time point.
    Running { until: Option<TimePoint> },
}

struct Control {
    state: RunState,
    latest_time: TimePoint,
    next_sample_time: TimePoint,
    /// Set between `hold` letting a step through and `publish` of its sample.
    stepping: bool,
    index: SpoolIndex,
    subscribers: BTreeMap<u64, Sender<ServerPacket>>,
}

impl Control {
    fn broadcast(&mut self, packet: ServerPacket) {
        self.subscribers.retain(|_id, subscriber| subscriber.send(packet.clone()).is_ok());
    }
}

/// What the simulation thread and the debug sessions share.
pub struct Bridge {
    control: Mutex<Control>,
    resumed: Condvar,
    inventory: Inventory,
    spool_path: PathBuf,
}

impl Bridge {
    pub fn new(inventory: Inventory, spool_path: PathBuf, start_paused: bool) -> Bridge {
        let state = if start_paused { RunState::Paused } else { RunState::Running { until: None } };
        Bridge {
            control: Mutex::new(Control {
                state,
                latest_time: TimePoint::ZERO,
                next_sample_time: TimePoint::ZERO,
                stepping: false,
                index: SpoolIndex::default(),
                subscribers: BTreeMap::new(),
            }),
            resumed: Condvar::new(),
            inventory,
            spool_path,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn state(&self) -> RunState {
        self.lock().state
    }

    pub fn latest_time(&self) -> TimePoint {
        self.lock().latest_time
    }

    /// Blocks the simulation thread until it may evaluate `next_time`.
    ///
    /// Reaching past the `until` time of a run pauses the simulation and tells every client.
    pub fn hold(&self, next_time: TimePoint) {
        let mut control = self.lock();
        control.next_sample_time = next_time;
        loop {
            match control.state {
                RunState::Running { until: Some(until) } if next_time > until => {
                    control.state = RunState::Paused;
                    let time = control.latest_time;
                    info!("Paused at {time}");
                    control.broadcast(ServerPacket::Event(Event::SimulationPaused {
                        time: time.to_wire(),
                        cause: PauseCause::UntilTime,
                    }));
                },
                RunState::Running { until: _ } => {
                    control.stepping = true;
                    return;
                },
                RunState::Paused => {
                    control = self.resumed.wait(control).unwrap_or_else(|poisoned| poisoned.into_inner());
                },
            }
        }
    }

    /// Makes a sample readable: everything up to `time` is on disk.
    pub fn publish(&self, time: TimePoint, recorded: Recorded) {
        let mut control = self.lock();
        if recorded.checkpoint {
            control.index.push(time, recorded.offset);
        }
        control.latest_time = time;
        control.stepping = false;
    }

    /// Resumes the simulation. `respond` runs before the simulation thread can act on it, so a
    /// response it sends always precedes the events the run causes.
    fn run(&self, until: Option<TimePoint>, respond: impl FnOnce()) {
        let mut control = self.lock();
        control.state = RunState::Running { until };
        respond();
        drop(control);
        self.resumed.notify_all();
    }

    /// Pauses the simulation before its next step. Returns the time of the last sample it
    /// produces, which is the one in flight if a step has already been let through.
    fn pause(&self) -> TimePoint {
        let mut control = self.lock();
        control.state = RunState::Paused;
        if control.stepping {
            control.next_sample_time
        } else {
            control.latest_time
        }
    }

    fn status(&self) -> Response {
        let control = self.lock();
        match control.state {
            RunState::Paused => Response::GetSimulationStatus {
                status: proto::SimulationStatus::Paused,
                latest_time: control.latest_time.to_wire(),
                next_sample_time: Some(control.next_sample_time.to_wire()),
            },
            RunState::Running { until: _ } => Response::GetSimulationStatus {
                status: proto::SimulationStatus::Running,
                latest_time: control.latest_time.to_wire(),
                next_sample_time: None,
            },
        }
    }

    fn history(&self) -> (SpoolIndex, TimePoint) {
        let control = self.lock();
        (control.index.clone(), control.latest_time)
    }

    fn subscribe(&self, id: u64, subscriber: Sender<ServerPacket>) {
        self.lock().subscribers.insert(id, subscriber);
    }

    fn unsubscribe(&self, id: u64) {
        self.lock().subscribers.remove(&id);
    }
}

/// Starts accepting debug clients on `address`. Returns the address actually bound.
pub fn listen(address: &str, bridge: Arc<Bridge>) -> Result<SocketAddr, AgentError> {
    let to_error = |source| AgentError::Bind { address: address.to_string(), source };
    let listener = TcpListener::bind(address).map_err(to_error)?;
    let local = listener.local_addr().map_err(to_error)?;
    info!("Listening for debuggers on {local}");

    thread::spawn(move || accept(listener, bridge));
    Ok(local)
}

fn accept(listener: TcpListener, bridge: Arc<Bridge>) {
    for (id, stream) in listener.incoming().enumerate() {
        match stream {
            Ok(stream) => {
                let bridge = bridge.clone();
                thread::spawn(move || serve(id as u64, stream, bridge));
            },
            Err(e) => warn!("Couldn't accept debug connection: {e}"),
        }
    }
}

fn serve(id: u64, stream: TcpStream, bridge: Arc<Bridge>) {
    let peer = stream.peer_addr().map(|peer| peer.to_string()).unwrap_or_else(|_| "unknown peer".to_string());
    info!("Debugger connected from {peer}");

    let mut writer = match stream.try_clone() {
        Ok(writer) => writer,
        Err(e) => {
            warn!("Couldn't set up connection to {peer}: {e}");
            return;
        },
    };

    let (packet_send, packet_recv) = channel::<ServerPacket>();
    let writer_thread = thread::spawn(move || {
        for packet in packet_recv {
            if let Err(e) = link::send(&mut writer, &packet) {
                debug!("Couldn't send packet: {e}");
                break;
            }
        }
    });

    let mut session = Session::new(id, bridge.clone(), packet_send);
    let mut reader = PacketReader::new(&stream);
    loop {
        match reader.recv() {
            Ok(Some(text)) => {
                if !session.handle(&text) {
                    break;
                }
            },
            Ok(None) => break,
            Err(e) => {
                warn!("Couldn't read from {peer}: {e}");
                break;
            },
        }
    }

    // the writer drains whatever is queued once the last sender is gone
    bridge.unsubscribe(id);
    drop(session);
    if writer_thread.join().is_err() {
        warn!("Writer for {peer} panicked");
    }
    let _ = stream.shutdown(Shutdown::Both);
    info!("Debugger at {peer} disconnected");
}

/// The state of one client connection.
struct Session {
    id: u64,
    bridge: Arc<Bridge>,
    outbox: Sender<ServerPacket>,
    greeted: bool,
    references: BTreeMap<String, Vec<usize>>,
    replayer: Option<Replayer<BufReader<File>>>,
}

impl Session {
    fn new(id: u64, bridge: Arc<Bridge>, outbox: Sender<ServerPacket>) -> Session {
        Session {
            id,
            bridge,
            outbox,
            greeted: false,
            references: BTreeMap::new(),
            replayer: None,
        }
    }

    fn reply(&self, packet: ServerPacket) {
        if self.outbox.send(packet).is_err() {
            debug!("Dropping reply to a closed connection");
        }
    }

    /// Handles one packet. Returns `false` when the connection should be closed.
    fn handle(&mut self, text: &str) -> bool {
        trace!("Received {text}");
        let packet = match proto::parse_client_packet(text) {
            Ok(packet) => packet,
            Err(error) => {
                self.reply(error.into());
                return self.greeted;
            },
        };

        match packet {
            ClientPacket::Greeting { version } if !self.greeted => {
                if version != proto::VERSION {
                    let message = format!("Unsupported protocol version {version}");
                    self.reply(ProtocolError::new(PROTOCOL_ERROR, message).into());
                    return false;
                }
                self.greeted = true;
                // subscribing after the greeting is queued keeps events from overtaking it
                self.reply(ServerPacket::greeting());
                self.bridge.subscribe(self.id, self.outbox.clone());
                true
            },
            ClientPacket::Greeting { version: _ } => {
                self.reply(ProtocolError::new(PROTOCOL_ERROR, "Already greeted").into());
                true
            },
            ClientPacket::Command(_command) if !self.greeted => {
                self.reply(ProtocolError::new(PROTOCOL_ERROR, "Expected a greeting").into());
                false
            },
            ClientPacket::Command(command) => {
                if let Err(error) = self.command(command) {
                    debug!("Command failed: {}", error.message);
                    self.reply(error.into());
                }
                true
            },
        }
    }

    fn command(&mut self, command: Command) -> Result<(), ProtocolError> {
        debug!("Handling {command:?}");
        match command {
            Command::ListScopes { scope } => {
                let scopes = self
                    .bridge
                    .inventory()
                    .scopes_in(scope.as_deref())
                    .into_iter()
                    .map(|scope| (scope.identifier.clone(), describe_scope(scope)))
                    .collect();
                self.reply(ServerPacket::Response(Response::ListScopes { scopes }));
            },
            Command::ListItems { scope } => {
                let items = self
                    .bridge
                    .inventory()
                    .items_in(scope.as_deref())
                    .into_iter()
                    .map(|item| (item.identifier.clone(), describe_item(item)))
                    .collect();
                self.reply(ServerPacket::Response(Response::ListItems { items }));
            },
            Command::ReferenceItems { reference, items } => {
                match items {
                    None => {
                        self.references.remove(&reference);
                    },
                    Some(designations) => {
                        let indices = self.resolve(&designations)?;
                        self.references.insert(reference, indices);
                    },
                }
                self.reply(ServerPacket::Response(Response::ReferenceItems {}));
            },
            Command::QueryInterval {
                interval: (begin, end),
                collapse: _,
                items,
                item_values_encoding,
                diagnostics,
            } => {
                let begin = parse_time(&begin)?;
                let end = parse_time(&end)?;
                let selected = match &items {
                    None => None,
                    Some(reference) => {
                        let indices = self.references.get(reference).ok_or_else(|| {
                            ProtocolError::new(INVALID_REFERENCE, format!("No such reference: {reference}"))
                        })?;
                        if item_values_encoding.as_deref() != Some(proto::ITEM_VALUES_ENCODING) {
                            let message = format!("Unsupported item values encoding: {item_values_encoding:?}");
                            return Err(ProtocolError::new(INVALID_ARGUMENT, message));
                        }
                        Some(indices.clone())
                    },
                };
                let samples = self.query(begin, end, selected.as_deref(), diagnostics)?;
                self.reply(ServerPacket::Response(Response::QueryInterval { samples }));
            },
            Command::GetSimulationStatus {} => {
                self.reply(ServerPacket::Response(self.bridge.status()));
            },
            Command::RunSimulation {
                until_time,
                until_diagnostics,
                sample_item_values: _,
            } => {
                let until = until_time.as_deref().map(parse_time).transpose()?;
                if !until_diagnostics.is_empty() {
                    debug!("Ignoring diagnostic breakpoints {until_diagnostics:?}: the design has none");
                }
                info!("Running until {}", until.map(|until| until.to_string()).unwrap_or("forever".to_string()));
                let outbox = &self.outbox;
                self.bridge.run(until, || {
                    let _ = outbox.send(ServerPacket::Response(Response::RunSimulation {}));
                });
            },
            Command::PauseSimulation {} => {
                let time = self.bridge.pause();
                info!("Paused at {time}");
                self.reply(ServerPacket::Response(Response::PauseSimulation { time: time.to_wire() }));
            },
        }
        Ok(())
    }

    /// Spool indices of the designated items. Fails without side effects.
    fn resolve(&self, designations: &[ItemDesignation]) -> Result<Vec<usize>, ProtocolError> {
        designations
            .iter()
            .map(|designation| match designation {
                ItemDesignation::Node((identifier,)) => self
                    .bridge
                    .inventory()
                    .item(identifier)
                    .map(|(index, _item)| index)
                    .ok_or_else(|| ProtocolError::new(INVALID_ARGUMENT, format!("No such item: {identifier}"))),
                ItemDesignation::MemoryRows(identifier, _first, _last) => Err(ProtocolError::new(
                    INVALID_ARGUMENT,
                    format!("Not a memory: {identifier}"),
                )),
            })
            .collect()
    }

    fn query(
        &mut self,
        begin: TimePoint,
        end: TimePoint,
        selected: Option<&[usize]>,
        diagnostics: bool,
    ) -> Result<Vec<proto::Sample>, ProtocolError> {
        let (index, latest_time) = self.bridge.history();
        let end = end.min(latest_time);

        let to_error = |e: SpoolError| ProtocolError::new(INTERNAL_ERROR, format!("Couldn't read spool: {e}"));
        if self.replayer.is_none() {
            self.replayer = Some(Replayer::open(&self.bridge.spool_path).map_err(to_error)?);
        }
        let Some(replayer) = self.replayer.as_mut() else {
            return Ok(vec![]);
        };
        let samples = replayer.query(&index, begin, end, selected.unwrap_or(&[])).map_err(to_error)?;

        let inventory = self.bridge.inventory();
        Ok(samples
            .into_iter()
            .map(|sample| proto::Sample {
                time: sample.time.to_wire(),
                item_values: selected.map(|selected| {
                    let widths = selected.iter().map(|index| inventory.items()[*index].width);
                    encode_item_values(&sample.values, widths)
                }),
                diagnostics: if diagnostics { Some(vec![]) } else { None },
            })
            .collect())
    }
}

fn parse_time(text: &str) -> Result<TimePoint, ProtocolError> {
    TimePoint::from_wire(text).map_err(|e| ProtocolError::new(INVALID_ARGUMENT, e.to_string()))
}

fn describe_scope(scope: &Scope) -> proto::ScopeDescription {
    proto::ScopeDescription::Module {
        definition: proto::Definition {
            src: None,
            name: scope.name.clone(),
            attributes: BTreeMap::new(),
        },
        instantiation: proto::Instantiation {
            src: None,
            attributes: BTreeMap::new(),
        },
    }
}

fn describe_item(item: &Item) -> proto::ItemDescription {
    proto::ItemDescription::Node {
        src: None,
        lsb_at: 0,
        width: item.width,
        input: item.input,
        output: item.output,
        settable: item.settable(),
        attributes: BTreeMap::new(),
    }
}

/// Packs values as little-endian u32 chunks, most significant chunk of each value first.
pub fn encode_item_values(values: &[Value], widths: impl IntoIterator<Item = Width>) -> String {
    let mut bytes = vec![];
    for (value, width) in values.iter().zip(widths) {
        for chunk in value.to_u32_chunks(width) {
            bytes.extend_from_slice(&chunk.to_le_bytes());
        }
    }
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
