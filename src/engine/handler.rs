use crate::{engine::window::ResponseWindow, errors::HandlerError};

/// Produces the replacement bytes for a matched response.
///
/// Runs on the packet path: implementations must finish in bounded time and
/// must not block.
pub trait ResponseHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Overwrite `window` in place from the `request` captured at registration.
    fn handle(&self, request: &[u8], window: &mut ResponseWindow) -> Result<(), HandlerError>;
}
