use std::fmt;
use std::net::Ipv4Addr;

use crate::errors::PacketError;
use crate::protocol::header::Header;

#[derive(Debug)]
/// https://en.wikipedia.org/wiki/Transmission_Control_Protocol
pub struct TCPHeader {
    pub source_port: u16,
    pub dest_port: u16,
    pub seq_number: u32,
    pub ack_number: u32,
    pub data_offset: u8,
    pub flags: u8,
    pub window_size: u16,
    pub checksum: u16,
    pub urgent_ptr: u16,
}

impl TCPHeader {
    /// Offset of the checksum field within the TCP header.
    pub const CHECKSUM_OFFSET: usize = 16;
}

impl Header for TCPHeader {
    const MIN_HEADER_SIZE: usize = 20;

    /// Parses a TCP header from the given buffer. Options are skipped, only
    /// their length is honoured through `data_offset`.
    fn parse(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < Self::MIN_HEADER_SIZE {
            return Err(PacketError::MissingContext);
        }

        let source_port = u16::from_be_bytes([buf[0], buf[1]]);
        let dest_port = u16::from_be_bytes([buf[2], buf[3]]);
        let seq_number = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let ack_number = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);

        let data_offset = buf[12] >> 4;
        let header_len = (data_offset as usize) * 4;
        if header_len < Self::MIN_HEADER_SIZE || header_len > buf.len() {
            return Err(PacketError::MissingContext);
        }
        let reserved_flags = u16::from_be_bytes([buf[12] & 0x0F, buf[13]]);
        let flags = (reserved_flags & 0x003F) as u8;

        let window_size = u16::from_be_bytes([buf[14], buf[15]]);
        let checksum = u16::from_be_bytes([buf[16], buf[17]]);
        let urgent_ptr = u16::from_be_bytes([buf[18], buf[19]]);

        Ok(TCPHeader {
            source_port,
            dest_port,
            seq_number,
            ack_number,
            data_offset,
            flags,
            window_size,
            checksum,
            urgent_ptr,
        })
    }

    fn header_length(&self) -> usize {
        (self.data_offset as usize) * 4
    }
}

/// A key identifying one TCP flow in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub saddr: Ipv4Addr,
    pub daddr: Ipv4Addr,
    pub sport: u16,
    pub dport: u16,
}

impl FlowKey {
    pub fn new(saddr: Ipv4Addr, daddr: Ipv4Addr, sport: u16, dport: u16) -> Self {
        FlowKey {
            saddr,
            daddr,
            sport,
            dport,
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.saddr, self.sport, self.daddr, self.dport
        )
    }
}
