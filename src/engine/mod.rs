pub mod dispatcher;
pub mod handler;
pub mod pattern;
pub mod registry;
pub mod rewriter;
pub mod window;

use log::{debug, trace, warn};
use std::sync::Arc;

use crate::{
    engine::{
        dispatcher::{Dispatcher, HandlerTable},
        pattern::PatternSet,
        registry::{HandlerDescriptor, HandlerKind, PendingRegistry},
    },
    errors::PacketError,
    packet::context::PacketContext,
    protocol::tcp::parser::FlowKey,
};

/// Bytes of payload a handler may rewrite. Every handler writes exactly this many.
pub const RESP_WINDOW_LEN: usize = 128;

/// Length of a pattern signature.
pub const PATTERN_LEN: usize = 15;

const _: () = assert!(PATTERN_LEN <= RESP_WINDOW_LEN);

/// What the hook should do with the packet. The engine never drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Unmodified,
    Modified,
}

pub struct Engine {
    registry: Arc<PendingRegistry>,
    patterns: PatternSet,
    dispatcher: Dispatcher,
}

impl Engine {
    pub fn new(patterns: PatternSet, handlers: HandlerTable) -> Self {
        let registry = Arc::new(PendingRegistry::new());
        Engine {
            dispatcher: Dispatcher::new(registry.clone(), handlers),
            registry,
            patterns,
        }
    }

    pub fn registry(&self) -> &Arc<PendingRegistry> {
        &self.registry
    }

    /// Arm `kind` for the next matching response on `flow`, replacing any
    /// handler already waiting there.
    pub fn register(&self, flow: FlowKey, kind: HandlerKind, request: impl Into<Vec<u8>>) {
        if self
            .registry
            .register(flow, HandlerDescriptor::new(kind, request))
            .is_some()
        {
            debug!("Replaced pending handler on {}", flow);
        }
        debug!("Registered {} handler on {}", kind, flow);
    }

    /// Run one packet through the engine, rewriting it in place on a match.
    pub fn process(&self, packet: &mut [u8]) -> Verdict {
        match self.try_rewrite(packet) {
            Ok((flow, kind)) => {
                debug!("Rewrote response on {} with {} handler", flow, kind);
                Verdict::Modified
            }
            Err(PacketError::HandlerFailed(_)) => {
                debug!("Forwarding original bytes after handler failure");
                Verdict::Unmodified
            }
            Err(e @ PacketError::UnknownHandlerKind(_)) => {
                warn!("Dropped registration: {}", e);
                Verdict::Unmodified
            }
            Err(e) => {
                trace!("Pass-through: {}", e);
                Verdict::Unmodified
            }
        }
    }

    /// Same as `process` but reports why a packet was left alone.
    pub fn try_rewrite(&self, packet: &mut [u8]) -> Result<(FlowKey, HandlerKind), PacketError> {
        let ctx = PacketContext::parse(packet)?;

        window::with_scratch(|window| {
            window::extract(packet, &ctx, window)?;
            if !self.patterns.matches(window) {
                return Err(PacketError::PatternMiss);
            }

            let kind = self.dispatcher.dispatch(&ctx.flow, window)?;
            rewriter::commit(packet, &ctx, window)?;
            Ok((ctx.flow, kind))
        })
    }
}
