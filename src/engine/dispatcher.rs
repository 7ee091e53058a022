use log::{trace, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    engine::{
        handler::ResponseHandler,
        registry::{HandlerKind, PendingRegistry},
        window::ResponseWindow,
    },
    errors::PacketError,
    protocol::tcp::parser::FlowKey,
};

/// Kind → implementation table. New kinds are added here, nothing else in the
/// pipeline needs to know about them.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<HandlerKind, Arc<dyn ResponseHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        HandlerTable {
            handlers: HashMap::new(),
        }
    }

    pub fn insert(&mut self, kind: HandlerKind, handler: Arc<dyn ResponseHandler>) {
        self.handlers.insert(kind, handler);
    }

    pub fn get(&self, kind: HandlerKind) -> Option<&Arc<dyn ResponseHandler>> {
        self.handlers.get(&kind)
    }

    pub fn contains(&self, kind: HandlerKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

pub struct Dispatcher {
    registry: Arc<PendingRegistry>,
    handlers: HandlerTable,
}

impl Dispatcher {
    pub fn new(registry: Arc<PendingRegistry>, handlers: HandlerTable) -> Self {
        Dispatcher { registry, handlers }
    }

    /// Consume the registration for `flow` and run its handler over `window`.
    ///
    /// The registration is gone once this returns, whatever the outcome.
    pub fn dispatch(
        &self,
        flow: &FlowKey,
        window: &mut ResponseWindow,
    ) -> Result<HandlerKind, PacketError> {
        let descriptor = self.registry.take(flow).ok_or(PacketError::RegistryMiss)?;
        let handler = self
            .handlers
            .get(descriptor.kind)
            .ok_or(PacketError::UnknownHandlerKind(descriptor.kind.0))?;

        if let Err(e) = handler.handle(&descriptor.request, window) {
            warn!("{} handler failed on {}: {}", handler.name(), flow, e);
            return Err(e.into());
        }
        trace!("{} handler answered {}", handler.name(), flow);
        Ok(descriptor.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::registry::HandlerDescriptor;
    use crate::engine::RESP_WINDOW_LEN;
    use crate::errors::HandlerError;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fill(u8, AtomicUsize);

    impl ResponseHandler for Fill {
        fn name(&self) -> &'static str {
            "fill"
        }

        fn handle(&self, _request: &[u8], window: &mut ResponseWindow) -> Result<(), HandlerError> {
            self.1.fetch_add(1, Ordering::SeqCst);
            window.fill(self.0);
            Ok(())
        }
    }

    struct Failing;

    impl ResponseHandler for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn handle(&self, _request: &[u8], _window: &mut ResponseWindow) -> Result<(), HandlerError> {
            Err(HandlerError::BadRequest)
        }
    }

    fn flow() -> FlowKey {
        FlowKey::new(Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(10, 0, 0, 9), 41002, 80)
    }

    fn setup() -> (Arc<PendingRegistry>, Arc<Fill>, Dispatcher) {
        let registry = Arc::new(PendingRegistry::new());
        let fill = Arc::new(Fill(b'z', AtomicUsize::new(0)));
        let mut table = HandlerTable::new();
        table.insert(HandlerKind(100), fill.clone());
        table.insert(HandlerKind(101), Arc::new(Failing));
        let dispatcher = Dispatcher::new(registry.clone(), table);
        (registry, fill, dispatcher)
    }

    #[test]
    fn test_dispatch_runs_handler_once() {
        let (registry, fill, dispatcher) = setup();
        registry.register(flow(), HandlerDescriptor::new(HandlerKind(100), "req"));

        let mut window = [0u8; RESP_WINDOW_LEN];
        assert_eq!(dispatcher.dispatch(&flow(), &mut window), Ok(HandlerKind(100)));
        assert!(window.iter().all(|&b| b == b'z'));
        assert_eq!(fill.1.load(Ordering::SeqCst), 1);

        assert_eq!(
            dispatcher.dispatch(&flow(), &mut window),
            Err(PacketError::RegistryMiss)
        );
        assert_eq!(fill.1.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_kind_consumes_registration() {
        let (registry, _, dispatcher) = setup();
        registry.register(flow(), HandlerDescriptor::new(HandlerKind(42), "req"));

        let mut window = [0u8; RESP_WINDOW_LEN];
        assert_eq!(
            dispatcher.dispatch(&flow(), &mut window),
            Err(PacketError::UnknownHandlerKind(42))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handler_failure_consumes_registration() {
        let (registry, _, dispatcher) = setup();
        registry.register(flow(), HandlerDescriptor::new(HandlerKind(101), "req"));

        let mut window = [0u8; RESP_WINDOW_LEN];
        assert_eq!(
            dispatcher.dispatch(&flow(), &mut window),
            Err(PacketError::HandlerFailed(HandlerError::BadRequest))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_table_lookup() {
        let (_, _, dispatcher) = setup();
        assert!(dispatcher.handlers.contains(HandlerKind(100)));
        assert!(!dispatcher.handlers.contains(HandlerKind::FS_WATCH));
    }
}
