use crate::{
    checksum::recompute_ipv4_tcp,
    engine::{window::ResponseWindow, RESP_WINDOW_LEN},
    errors::PacketError,
    packet::context::PacketContext,
};

/// Write `window` back over the payload it was extracted from and fix up the
/// checksums. The packet length never changes.
pub fn commit(
    packet: &mut [u8],
    ctx: &PacketContext,
    window: &ResponseWindow,
) -> Result<(), PacketError> {
    let start = ctx.payload_offset;
    let span = packet
        .get_mut(start..start + RESP_WINDOW_LEN)
        .ok_or(PacketError::InsufficientPayload(
            ctx.payload_length().unwrap_or(0),
        ))?;
    span.copy_from_slice(window);

    recompute_ipv4_tcp(packet, ctx.ip_header_len, ctx.total_length);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{build_tcp_packet, checksums_valid};

    #[test]
    fn test_commit_rewrites_only_window_and_checksum() {
        let payload = vec![b'a'; RESP_WINDOW_LEN + 10];
        let original = build_tcp_packet([10, 0, 0, 5], [10, 0, 0, 9], 41002, 80, &payload);
        let mut pkt = original.clone();
        let ctx = PacketContext::parse(&pkt).unwrap();

        let window = [b'b'; RESP_WINDOW_LEN];
        commit(&mut pkt, &ctx, &window).unwrap();

        assert_eq!(pkt.len(), original.len());
        assert!(checksums_valid(&pkt));
        assert_eq!(&pkt[40..40 + RESP_WINDOW_LEN], &window[..]);
        assert_eq!(&pkt[40 + RESP_WINDOW_LEN..], &original[40 + RESP_WINDOW_LEN..]);

        let changed: Vec<usize> = (0..40).filter(|&i| pkt[i] != original[i]).collect();
        assert!(changed.iter().all(|&i| i == 36 || i == 37), "{changed:?}");
    }

    #[test]
    fn test_commit_identical_window_is_noop() {
        let payload = vec![b'a'; RESP_WINDOW_LEN];
        let original = build_tcp_packet([10, 0, 0, 5], [10, 0, 0, 9], 1, 2, &payload);
        let mut pkt = original.clone();
        let ctx = PacketContext::parse(&pkt).unwrap();

        commit(&mut pkt, &ctx, &[b'a'; RESP_WINDOW_LEN]).unwrap();
        assert_eq!(pkt, original);
    }
}
