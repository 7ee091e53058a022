//! Packet builders shared by unit tests.

use std::net::Ipv4Addr;

use crate::checksum::{internet_checksum, recompute_ipv4_tcp};

/// Build an IPv4/TCP packet with a 20 byte TCP header and valid checksums.
pub fn build_tcp_packet(
    src: [u8; 4],
    dst: [u8; 4],
    sport: u16,
    dport: u16,
    payload: &[u8],
) -> Vec<u8> {
    build_tcp_packet_with_options(src, dst, sport, dport, &[], &[], payload)
}

/// Same as `build_tcp_packet` with IPv4 and TCP options. Both option lists
/// must be a multiple of 4 bytes.
pub fn build_tcp_packet_with_options(
    src: [u8; 4],
    dst: [u8; 4],
    sport: u16,
    dport: u16,
    ip_options: &[u8],
    tcp_options: &[u8],
    payload: &[u8],
) -> Vec<u8> {
    assert!(ip_options.len() % 4 == 0 && tcp_options.len() % 4 == 0);
    let ihl = 20 + ip_options.len();
    let thl = 20 + tcp_options.len();
    let total = ihl + thl + payload.len();
    let mut pkt = vec![0u8; total];

    pkt[0] = 0x40 | (ihl / 4) as u8;
    pkt[2..4].copy_from_slice(&(total as u16).to_be_bytes());
    pkt[4..6].copy_from_slice(&0x1c46u16.to_be_bytes());
    pkt[6] = 0x40; // DF
    pkt[8] = 64;
    pkt[9] = 6;
    pkt[12..16].copy_from_slice(&src);
    pkt[16..20].copy_from_slice(&dst);
    pkt[20..ihl].copy_from_slice(ip_options);

    let tcp = &mut pkt[ihl..ihl + thl];
    tcp[0..2].copy_from_slice(&sport.to_be_bytes());
    tcp[2..4].copy_from_slice(&dport.to_be_bytes());
    tcp[4..8].copy_from_slice(&1000u32.to_be_bytes());
    tcp[8..12].copy_from_slice(&2000u32.to_be_bytes());
    tcp[12] = ((thl / 4) as u8) << 4;
    tcp[13] = 0x18; // PSH|ACK
    tcp[14..16].copy_from_slice(&64240u16.to_be_bytes());
    tcp[20..].copy_from_slice(tcp_options);

    pkt[ihl + thl..].copy_from_slice(payload);
    recompute_ipv4_tcp(&mut pkt, ihl, total);
    pkt
}

/// True when both the IPv4 header and the TCP segment checksums verify.
pub fn checksums_valid(pkt: &[u8]) -> bool {
    let ihl = ((pkt[0] & 0x0F) as usize) * 4;
    let total = u16::from_be_bytes([pkt[2], pkt[3]]) as usize;
    if internet_checksum(&pkt[..ihl]) != 0 {
        return false;
    }

    let src = Ipv4Addr::new(pkt[12], pkt[13], pkt[14], pkt[15]);
    let dst = Ipv4Addr::new(pkt[16], pkt[17], pkt[18], pkt[19]);
    let segment = &pkt[ihl..total];
    let mut pseudo = Vec::with_capacity(12 + segment.len());
    pseudo.extend_from_slice(&src.octets());
    pseudo.extend_from_slice(&dst.octets());
    pseudo.extend_from_slice(&[0, 6]);
    pseudo.extend_from_slice(&(segment.len() as u16).to_be_bytes());
    pseudo.extend_from_slice(segment);
    internet_checksum(&pseudo) == 0
}

/// An HTTP response payload of at least `len` bytes starting with `status`.
pub fn http_payload(status: &str, len: usize) -> Vec<u8> {
    let mut body = format!("{status}\r\nContent-Type: text/plain\r\n\r\n").into_bytes();
    while body.len() < len {
        body.push(b'a' + (body.len() % 26) as u8);
    }
    body
}
