//! NUL-delimited packet framing.

use crate::proto::ServerPacket;

use std::io::{BufRead, BufReader, Read, Write};
use log::*;

pub struct PacketReader<R> {
    reader: BufReader<R>,
}

impl<R: Read> PacketReader<R> {
    pub fn new(reader: R) -> PacketReader<R> {
        PacketReader { reader: BufReader::new(reader) }
    }

    /// The next packet, without its terminator. `None` once the peer hangs up, including in the
    /// middle of a packet.
    pub fn recv(&mut self) -> std::io::Result<Option<String>> {
        let mut buffer = vec![];
        self.reader.read_until(b'\0', &mut buffer)?;
        if buffer.pop() != Some(b'\0') {
            if !buffer.is_empty() {
                debug!("Dropping {} bytes of an unterminated packet", buffer.len());
            }
            return Ok(None);
        }
        String::from_utf8(buffer)
            .map(Some)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

pub fn send<W: Write>(writer: &mut W, packet: &ServerPacket) -> std::io::Result<()> {
    let mut buffer = serde_json::to_vec(packet)?;
    trace!("Sending {}", String::from_utf8_lossy(&buffer));
    buffer.push(b'\0');
    writer.write_all(&buffer)?;
    writer.flush()
}
