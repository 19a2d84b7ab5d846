//! Blocking TCP transport: packet framing plus reliable send/receive.

use crate::RemoteArray;
use njb_error::{NjbError, Result};
use njb_proto::{Command, CommandWord, PacketHeader, HEADER_LEN, PAYLOAD_LEN};
use njb_types::Block;
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use tracing::{debug, trace};

/// Cumulative wire statistics.
#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    /// Commands fully executed (request sent and response received).
    pub commands: u64,
    /// Read-block commands among them.
    pub reads: u64,
    /// Write-block commands among them.
    pub writes: u64,
    /// Bytes put on the wire.
    pub bytes_sent: u64,
    /// Bytes taken off the wire.
    pub bytes_received: u64,
}

/// Connected transport to the remote array.
///
/// Every exchange is one request frame out, one response frame in.
/// `read_exact`/`write_all` provide the transfer-exactly-n-bytes-or-fail
/// primitive; any underlying error aborts the exchange immediately — no
/// partial-result salvage, no retry, no reconnection.
pub struct TcpTransport {
    stream: TcpStream,
    stats: Arc<Mutex<TransportStats>>,
}

impl TcpTransport {
    /// Open a connection to the array server.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        // Request/response over tiny frames; batching hurts latency here.
        stream.set_nodelay(true)?;
        debug!(host, port, "connected to jbod server");
        Ok(Self {
            stream,
            stats: Arc::default(),
        })
    }

    /// Close the connection. Dropping the transport has the same effect.
    pub fn disconnect(self) {
        debug!("disconnecting from jbod server");
        drop(self);
    }

    /// Snapshot of the wire counters.
    #[must_use]
    pub fn stats(&self) -> TransportStats {
        self.stats.lock().clone()
    }

    /// Shared handle for observing counters while a session owns the
    /// transport.
    #[must_use]
    pub fn stats_handle(&self) -> Arc<Mutex<TransportStats>> {
        Arc::clone(&self.stats)
    }

    fn send_packet(&mut self, word: CommandWord, block: Option<&Block>) -> Result<()> {
        let header = PacketHeader::request(word);
        let mut frame = [0_u8; HEADER_LEN + PAYLOAD_LEN];
        frame[..HEADER_LEN].copy_from_slice(&header.to_bytes());
        let mut frame_len = HEADER_LEN;
        if word.command.carries_payload() {
            let payload = block.ok_or_else(|| {
                NjbError::Protocol("write-block command without a payload buffer".to_owned())
            })?;
            frame[HEADER_LEN..].copy_from_slice(payload);
            frame_len += PAYLOAD_LEN;
        }
        self.stream.write_all(&frame[..frame_len])?;
        self.stats.lock().bytes_sent += frame_len as u64;
        Ok(())
    }

    fn recv_packet(&mut self, block: Option<&mut Block>) -> Result<PacketHeader> {
        let mut header_bytes = [0_u8; HEADER_LEN];
        self.stream.read_exact(&mut header_bytes)?;
        let header = PacketHeader::from_bytes(header_bytes);
        header.validate()?;

        let mut received = HEADER_LEN;
        if header.has_payload() {
            let sink = block.ok_or_else(|| {
                NjbError::Protocol("response carries a payload but none was expected".to_owned())
            })?;
            self.stream.read_exact(sink)?;
            received += PAYLOAD_LEN;
        }
        self.stats.lock().bytes_received += received as u64;
        Ok(header)
    }
}

impl RemoteArray for TcpTransport {
    fn execute(&mut self, word: CommandWord, mut block: Option<&mut Block>) -> Result<u16> {
        trace!(command = ?word.command, disk = %word.disk, block = %word.block, "execute");
        self.send_packet(word, block.as_deref())?;
        let header = self.recv_packet(block.as_deref_mut())?;

        let mut stats = self.stats.lock();
        stats.commands += 1;
        match word.command {
            Command::ReadBlock => stats.reads += 1,
            Command::WriteBlock => stats.writes += 1,
            _ => {}
        }
        drop(stats);
        Ok(header.return_code)
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer", &self.stream.peer_addr().ok())
            .field("stats", &*self.stats.lock())
            .finish_non_exhaustive()
    }
}
