//! RFC 1071 internet checksums for IPv4 headers and TCP segments.

use std::net::Ipv4Addr;

use crate::ip::IP4Header;
use crate::protocol::tcp::parser::TCPHeader;

const IPPROTO_TCP: u8 = 6;

/// Sum 16-bit big-endian words into `acc` without folding.
fn sum_words(acc: u32, data: &[u8]) -> u32 {
    let mut sum = acc;
    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum = sum.wrapping_add(u16::from_be_bytes([word[0], word[1]]) as u32);
    }
    if let [last] = chunks.remainder() {
        sum = sum.wrapping_add((*last as u32) << 8);
    }
    sum
}

fn fold(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Checksum of `data` as a standalone buffer.
pub fn internet_checksum(data: &[u8]) -> u16 {
    fold(sum_words(0, data))
}

/// IPv4 header checksum, skipping the checksum field itself.
pub fn ipv4_header_checksum(header: &[u8]) -> u16 {
    let off = IP4Header::CHECKSUM_OFFSET;
    let sum = sum_words(0, &header[..off]);
    fold(sum_words(sum, &header[off + 2..]))
}

/// TCP checksum over the pseudo-header and `segment`, skipping the segment's
/// checksum field.
pub fn tcp_checksum(src: Ipv4Addr, dst: Ipv4Addr, segment: &[u8]) -> u16 {
    let mut sum = sum_words(0, &src.octets());
    sum = sum_words(sum, &dst.octets());
    sum = sum.wrapping_add(IPPROTO_TCP as u32);
    sum = sum.wrapping_add(segment.len() as u32);

    let off = TCPHeader::CHECKSUM_OFFSET;
    sum = sum_words(sum, &segment[..off]);
    fold(sum_words(sum, &segment[off + 2..]))
}

/// Rewrite both checksums of an IPv4/TCP packet in place.
///
/// `ip_header_len` and `total_length` must come from an already validated
/// header.
pub fn recompute_ipv4_tcp(packet: &mut [u8], ip_header_len: usize, total_length: usize) {
    let src = Ipv4Addr::new(packet[12], packet[13], packet[14], packet[15]);
    let dst = Ipv4Addr::new(packet[16], packet[17], packet[18], packet[19]);

    let ip_sum = ipv4_header_checksum(&packet[..ip_header_len]);
    let off = IP4Header::CHECKSUM_OFFSET;
    packet[off..off + 2].copy_from_slice(&ip_sum.to_be_bytes());

    let segment = &mut packet[ip_header_len..total_length];
    let tcp_sum = tcp_checksum(src, dst, segment);
    let off = TCPHeader::CHECKSUM_OFFSET;
    segment[off..off + 2].copy_from_slice(&tcp_sum.to_be_bytes());
}
