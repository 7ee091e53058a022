use crate::{
    errors::PacketError,
    ip::{IP4Header, IPProtocol},
    protocol::{
        header::Header,
        tcp::parser::{FlowKey, TCPHeader},
    },
};

/// Header facts the engine needs about one IPv4/TCP packet.
///
/// Built once per packet and read-only afterwards. Offsets index into the
/// raw packet buffer starting at the IPv4 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketContext {
    pub flow: FlowKey,
    pub ip_header_len: usize,
    pub tcp_header_len: usize,
    /// IPv4 total length, never larger than the captured buffer.
    pub total_length: usize,
    pub payload_offset: usize,
}

impl PacketContext {
    pub fn parse(packet: &[u8]) -> Result<Self, PacketError> {
        let ip = IP4Header::parse(packet)?;
        if ip.packet_protocol() != IPProtocol::TCP || ip.is_fragment() {
            return Err(PacketError::MissingContext);
        }

        let ip_header_len = ip.header_length();
        let total_length = ip.total_length as usize;
        if total_length < ip_header_len || total_length > packet.len() {
            return Err(PacketError::MissingContext);
        }

        let tcp = TCPHeader::parse(&packet[ip_header_len..total_length])?;
        let tcp_header_len = tcp.header_length();

        Ok(PacketContext {
            flow: FlowKey::new(
                ip.source_address,
                ip.destination_address,
                tcp.source_port,
                tcp.dest_port,
            ),
            ip_header_len,
            tcp_header_len,
            total_length,
            payload_offset: ip_header_len + tcp_header_len,
        })
    }

    /// Bytes of TCP payload according to the headers.
    pub fn payload_length(&self) -> Option<usize> {
        self.total_length
            .checked_sub(self.ip_header_len + self.tcp_header_len)
    }
}
