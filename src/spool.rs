//! The spool: an append-only history of every value the simulation produced.
//!
//! The file starts with [`MAGIC`], followed by frames. A frame is a little-endian `u32` length and
//! a bincode-encoded [`Entry`] of that many bytes. The first entry is always a `Define`.
//!
//! `Sample` entries hold only the items that changed since the previous entry. `Checkpoint`
//! entries hold every item and are where replay may start.

use super::*;
use crate::sim::NetId;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use log::*;

pub const MAGIC: &[u8; 8] = b"BSPOOL02";

/// One in this many samples is written as a checkpoint. The first sample always is.
pub const CHECKPOINT_INTERVAL: u64 = 1024;

const CONFIG: bincode::config::Configuration = bincode::config::standard();

/// A spool index and the value of that item. `None` is an undefined value.
type Change = (u32, Option<u64>);

/// The payload of one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum Entry {
    /// The identifier and width of every item, in spool index order.
    Define { items: Vec<(String, u32)> },
    Sample { secs: u64, femtos: u64, changes: Vec<Change> },
    Checkpoint { secs: u64, femtos: u64, changes: Vec<Change> },
}

impl Entry {
    fn to_frame(&self) -> std::io::Result<Vec<u8>> {
        let payload = bincode::serde::encode_to_vec(self, CONFIG)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e.to_string()))?;
        let mut frame = Vec::with_capacity(4 + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }
}

/// The write end of a spool file.
#[derive(Debug)]
pub struct Spool {
    path: PathBuf,
    file: BufWriter<File>,
    offset: u64,
}

impl Spool {
    /// Creates (or truncates) the spool file at `path`.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Spool, AgentError> {
        let path = path.as_ref().to_path_buf();
        let to_error = |source| AgentError::Spool { path: path.clone(), source };
        let file = File::create(&path).map_err(to_error)?;
        let mut spool = Spool {
            path: path.clone(),
            file: BufWriter::new(file),
            offset: 0,
        };
        spool.append(MAGIC).map_err(to_error)?;
        debug!("Opened spool {}", path.display());
        Ok(spool)
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Appends `bytes` and flushes them. Returns the offset they were written at.
    fn append(&mut self, bytes: &[u8]) -> std::io::Result<u64> {
        let offset = self.offset;
        self.file.write_all(bytes)?;
        self.file.flush()?;
        self.offset += bytes.len() as u64;
        Ok(offset)
    }
}

/// Where replay may start from: the offset of every checkpoint, by time.
#[derive(Debug, Clone, Default)]
pub struct SpoolIndex {
    checkpoints: Vec<(TimePoint, u64)>,
}

impl SpoolIndex {
    pub fn push(&mut self, time: TimePoint, offset: u64) {
        self.checkpoints.push((time, offset));
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// The offset of the last checkpoint at or before `time`, falling back to the first one.
    pub fn offset_for(&self, time: TimePoint) -> Option<u64> {
        let after = self.checkpoints.partition_point(|(checkpoint_time, _offset)| *checkpoint_time <= time);
        self.checkpoints.get(after.saturating_sub(1)).map(|(_time, offset)| *offset)
    }
}

/// What [`Recorder::record`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    pub offset: u64,
    pub checkpoint: bool,
}

/// Writes samples of an [`Inventory`] into a [`Spool`].
#[derive(Debug)]
pub struct Recorder {
    spool: Spool,
    net_ids: Vec<NetId>,
    last: Vec<Value>,
    samples: u64,
}

impl Recorder {
    pub fn new(mut spool: Spool, inventory: &Inventory) -> Result<Recorder, AgentError> {
        let items = inventory.items();
        let define = Entry::Define {
            items: items.iter().map(|item| (item.identifier.clone(), item.width as u32)).collect(),
        };
        let frame = define.to_frame().map_err(AgentError::SpoolWrite)?;
        spool.append(&frame).map_err(AgentError::SpoolWrite)?;

        Ok(Recorder {
            spool,
            net_ids: items.iter().map(|item| item.net_id).collect(),
            last: vec![Value::X; items.len()],
            samples: 0,
        })
    }

    /// Records the state of the design at `time`. `net_values` is indexed by net.
    pub fn record(&mut self, time: TimePoint, net_values: &[Value]) -> Result<Recorded, AgentError> {
        let checkpoint = self.samples % CHECKPOINT_INTERVAL == 0;
        let mut changes: Vec<Change> = vec![];
        for (index, net_id) in self.net_ids.iter().enumerate() {
            let value = net_values[*net_id];
            if checkpoint || value != self.last[index] {
                changes.push((index as u32, value.to_u64()));
            }
            self.last[index] = value;
        }

        let (secs, femtos) = (time.secs(), time.subsec_femtos());
        let entry = if checkpoint {
            Entry::Checkpoint { secs, femtos, changes }
        } else {
            Entry::Sample { secs, femtos, changes }
        };
        let frame = entry.to_frame().map_err(AgentError::SpoolWrite)?;
        let offset = self.spool.append(&frame).map_err(AgentError::SpoolWrite)?;
        self.samples += 1;
        trace!("Recorded {} at {time} (offset {offset})", if checkpoint { "checkpoint" } else { "sample" });
        Ok(Recorded { offset, checkpoint })
    }
}

/// One record read back from a spool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub time: TimePoint,
    pub checkpoint: bool,
    pub changes: Vec<(usize, Value)>,
}

/// The read end of a spool file.
pub struct SpoolReader<R> {
    reader: R,
    offset: u64,
    items: Vec<(String, Width)>,
}

impl SpoolReader<BufReader<File>> {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, SpoolError> {
        SpoolReader::new(BufReader::new(File::open(path)?))
    }
}

/// Fills `buf`, or returns `false` if the spool ends first. A frame cut off by the end of the
/// file is one the writer hasn't finished yet.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool, SpoolError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// The entry in the frame at the current position, or `None` if the frame is incomplete.
fn read_entry<R: Read>(reader: &mut R, start: u64) -> Result<Option<Entry>, SpoolError> {
    let mut len = [0u8; 4];
    if !fill(reader, &mut len)? {
        return Ok(None);
    }
    let mut payload = vec![0u8; u32::from_le_bytes(len) as usize];
    if !fill(reader, &mut payload)? {
        return Ok(None);
    }
    let (entry, _len) = bincode::serde::decode_from_slice(&payload, CONFIG).map_err(|e| {
        warn!("Couldn't decode spool entry at offset {start}: {e}");
        SpoolError::Corrupt(start)
    })?;
    Ok(Some(entry))
}

impl<R: Read + Seek> SpoolReader<R> {
    pub fn new(mut reader: R) -> Result<Self, SpoolError> {
        let mut magic = [0u8; 8];
        if !fill(&mut reader, &mut magic)? || &magic != MAGIC {
            return Err(SpoolError::BadMagic);
        }

        let start = MAGIC.len() as u64;
        let items = match read_entry(&mut reader, start)? {
            Some(Entry::Define { items }) => items.into_iter().map(|(name, width)| (name, width as Width)).collect(),
            _ => return Err(SpoolError::Corrupt(start)),
        };
        let offset = reader.stream_position()?;

        Ok(SpoolReader { reader, offset, items })
    }

    /// The identifier and width of every item, in spool index order.
    pub fn items(&self) -> &[(String, Width)] {
        &self.items
    }

    pub fn seek(&mut self, offset: u64) -> Result<(), SpoolError> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        Ok(())
    }

    /// The next complete record, or `None` at the end of the spool.
    pub fn next_record(&mut self) -> Result<Option<Record>, SpoolError> {
        let start = self.offset;
        let Some(entry) = read_entry(&mut self.reader, start)? else {
            // leave the reader where a later call can pick the record up once it is complete
            self.seek(start)?;
            return Ok(None);
        };
        self.offset = self.reader.stream_position()?;

        let (secs, femtos, changes, checkpoint) = match entry {
            Entry::Sample { secs, femtos, changes } => (secs, femtos, changes, false),
            Entry::Checkpoint { secs, femtos, changes } => (secs, femtos, changes, true),
            Entry::Define { items: _ } => return Err(SpoolError::Corrupt(start)),
        };
        let changes = changes
            .into_iter()
            .map(|(index, value)| {
                let index = index as usize;
                let (_name, width) = self.items.get(index).ok_or(SpoolError::Corrupt(start))?;
                Ok((index, value.map_or(Value::X, |n| Value::word(*width, n))))
            })
            .collect::<Result<Vec<_>, SpoolError>>()?;

        Ok(Some(Record {
            time: TimePoint::new(secs, femtos),
            checkpoint,
            changes,
        }))
    }
}

/// The state of the selected items at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub time: TimePoint,
    pub values: Vec<Value>,
}

/// Reconstructs past states from a spool.
pub struct Replayer<R> {
    reader: SpoolReader<R>,
}

impl Replayer<BufReader<File>> {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, SpoolError> {
        Ok(Replayer { reader: SpoolReader::open(path)? })
    }
}

impl<R: Read + Seek> Replayer<R> {
    /// The state at the latest sample at or before `begin`, followed by every sample in
    /// `(begin, end]`. Records sharing a time collapse into one sample with the final state.
    ///
    /// `select` picks the items (by spool index) that each sample carries.
    pub fn query(
        &mut self,
        index: &SpoolIndex,
        begin: TimePoint,
        end: TimePoint,
        select: &[usize],
    ) -> Result<Vec<Sample>, SpoolError> {
        let Some(offset) = index.offset_for(begin) else {
            return Ok(vec![]);
        };
        self.reader.seek(offset)?;

        let mut state = vec![Value::X; self.reader.items().len()];
        let mut current: Option<TimePoint> = None;
        let mut floor: Option<Sample> = None;
        let mut samples: Vec<Sample> = vec![];

        let snapshot = |time: TimePoint, state: &[Value]| Sample {
            time,
            values: select.iter().map(|index| state[*index]).collect(),
        };

        loop {
            let record = self.reader.next_record()?;
            let next_time = record.as_ref().map(|record| record.time);

            // the group at `current` is complete once a record with another time (or the end) shows up
            if let Some(time) = current {
                if next_time != Some(time) {
                    if time <= begin {
                        floor = Some(snapshot(time, &state));
                    } else {
                        samples.extend(floor.take());
                        samples.push(snapshot(time, &state));
                    }
                }
            }

            let Some(record) = record else { break };
            if record.time > end {
                break;
            }
            for (index, value) in record.changes {
                state[index] = value;
            }
            current = Some(record.time);
        }

        if let Some(floor) = floor {
            samples.insert(0, floor);
        }
        Ok(samples)
    }
}
