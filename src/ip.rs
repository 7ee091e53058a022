use std::net::Ipv4Addr;

use crate::errors::PacketError;
use crate::protocol::header::Header;

/// https://en.wikipedia.org/wiki/List_of_IP_protocol_numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IPProtocol {
    /// https://en.wikipedia.org/wiki/Internet_Control_Message_Protocol
    ICMP,
    /// https://en.wikipedia.org/wiki/Transmission_Control_Protocol
    TCP,
    /// https://en.wikipedia.org/wiki/User_Datagram_Protocol
    UDP,
    Other(u8),
}

impl From<u8> for IPProtocol {
    fn from(value: u8) -> Self {
        match value {
            1 => IPProtocol::ICMP,
            6 => IPProtocol::TCP,
            17 => IPProtocol::UDP,
            n => IPProtocol::Other(n),
        }
    }
}

/// IPv4 header
#[derive(Debug)]
pub struct IP4Header {
    pub ver: u8, // Version
    pub ihl: u8, // Internet Header Length
    pub type_of_service: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags: u8,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub header_checksum: u16,
    pub source_address: Ipv4Addr,
    pub destination_address: Ipv4Addr,
}

impl IP4Header {
    /// Offset of the header checksum field.
    pub const CHECKSUM_OFFSET: usize = 10;

    pub fn packet_protocol(&self) -> IPProtocol {
        IPProtocol::from(self.protocol)
    }

    /// True when this datagram is one piece of a fragmented packet.
    pub fn is_fragment(&self) -> bool {
        // MF flag or a non-zero offset
        self.flags & 0x1 != 0 || self.fragment_offset != 0
    }
}

impl Header for IP4Header {
    const MIN_HEADER_SIZE: usize = 20;

    fn parse(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < Self::MIN_HEADER_SIZE {
            return Err(PacketError::MissingContext);
        }

        let ver = (buf[0] >> 4) & 0xF;
        if ver != 4 {
            return Err(PacketError::MissingContext);
        }
        let ihl = buf[0] & 0x0F;
        if (ihl as usize) * 4 < Self::MIN_HEADER_SIZE || (ihl as usize) * 4 > buf.len() {
            return Err(PacketError::MissingContext);
        }

        let type_of_service = buf[1];
        let total_length = u16::from_be_bytes([buf[2], buf[3]]);
        let identification = u16::from_be_bytes([buf[4], buf[5]]);
        let flags = (buf[6] >> 5) & 0x7;
        let fragment_offset = u16::from_be_bytes([buf[6] & 0x1F, buf[7]]);
        let ttl = buf[8];
        let protocol = buf[9];
        let header_checksum = u16::from_be_bytes([buf[10], buf[11]]);
        let source_address = Ipv4Addr::new(buf[12], buf[13], buf[14], buf[15]);
        let destination_address = Ipv4Addr::new(buf[16], buf[17], buf[18], buf[19]);

        Ok(IP4Header {
            ver,
            ihl,
            type_of_service,
            total_length,
            identification,
            flags,
            fragment_offset,
            ttl,
            protocol,
            header_checksum,
            source_address,
            destination_address,
        })
    }

    fn header_length(&self) -> usize {
        (self.ihl as usize) * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> [u8; 20] {
        [
            0x45, 0x00, 0x00, 0x3c, 0x1c, 0x46, 0x40, 0x00, 0x40, 0x06, 0xb1, 0xe6, 10, 0, 0, 9,
            10, 0, 0, 5,
        ]
    }

    #[test]
    fn test_parse_ipv4_fields() {
        let hdr = IP4Header::parse(&sample_header()).unwrap();
        assert_eq!(hdr.ver, 4);
        assert_eq!(hdr.header_length(), 20);
        assert_eq!(hdr.total_length, 60);
        assert_eq!(hdr.ttl, 64);
        assert_eq!(hdr.packet_protocol(), IPProtocol::TCP);
        assert_eq!(hdr.source_address, Ipv4Addr::new(10, 0, 0, 9));
        assert_eq!(hdr.destination_address, Ipv4Addr::new(10, 0, 0, 5));
        assert!(!hdr.is_fragment());
    }

    #[test]
    fn test_reject_short_buffer() {
        let buf = sample_header();
        assert_eq!(
            IP4Header::parse(&buf[..19]).unwrap_err(),
            PacketError::MissingContext
        );
    }

    #[test]
    fn test_reject_ipv6() {
        let mut buf = sample_header();
        buf[0] = 0x60;
        assert!(IP4Header::parse(&buf).is_err());
    }

    #[test]
    fn test_reject_bad_ihl() {
        let mut buf = sample_header();
        buf[0] = 0x44;
        assert!(IP4Header::parse(&buf).is_err());
        buf[0] = 0x46;
        assert!(IP4Header::parse(&buf).is_err());
    }

    #[test]
    fn test_fragment_detection() {
        let mut buf = sample_header();
        buf[6] = 0x20; // MF
        assert!(IP4Header::parse(&buf).unwrap().is_fragment());
    }
}
