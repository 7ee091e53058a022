use std::cell::RefCell;

use crate::engine::RESP_WINDOW_LEN;
use crate::errors::PacketError;
use crate::packet::context::PacketContext;

/// The leading `RESP_WINDOW_LEN` bytes of a TCP payload.
pub type ResponseWindow = [u8; RESP_WINDOW_LEN];

thread_local! {
    static SCRATCH: RefCell<ResponseWindow> = const { RefCell::new([0; RESP_WINDOW_LEN]) };
}

/// Run `f` with this thread's scratch window.
///
/// The buffer is reused across packets on the same thread and its contents
/// are only meaningful after `extract` has filled it.
pub fn with_scratch<R>(f: impl FnOnce(&mut ResponseWindow) -> R) -> R {
    SCRATCH.with(|cell| f(&mut cell.borrow_mut()))
}

/// Copy the response window out of `packet` into `window`.
///
/// Payloads shorter than the window are never matched, even when the rest of
/// the response follows in a later segment.
pub fn extract(
    packet: &[u8],
    ctx: &PacketContext,
    window: &mut ResponseWindow,
) -> Result<(), PacketError> {
    let payload_len = ctx.payload_length().unwrap_or(0);
    if payload_len < RESP_WINDOW_LEN {
        return Err(PacketError::InsufficientPayload(payload_len));
    }

    let start = ctx.payload_offset;
    let src = packet
        .get(start..start + RESP_WINDOW_LEN)
        .ok_or(PacketError::InsufficientPayload(payload_len))?;
    window.copy_from_slice(src);
    Ok(())
}
