use dashmap::DashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::protocol::tcp::parser::FlowKey;

/// Tag selecting which handler answers a pending request.
///
/// Values follow the control plane's handler ids, so unknown ones are
/// representable and rejected at dispatch time rather than here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerKind(pub u32);

impl HandlerKind {
    pub const FS_WATCH: HandlerKind = HandlerKind(3);
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HandlerKind::FS_WATCH => write!(f, "fs_watch"),
            HandlerKind(n) => write!(f, "kind#{n}"),
        }
    }
}

/// A handler waiting for the response on one flow.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    pub kind: HandlerKind,
    /// Opaque to the engine; only the handler interprets it.
    pub request: Vec<u8>,
    registered_at: Instant,
}

impl HandlerDescriptor {
    pub fn new(kind: HandlerKind, request: impl Into<Vec<u8>>) -> Self {
        HandlerDescriptor {
            kind,
            request: request.into(),
            registered_at: Instant::now(),
        }
    }

    pub fn registered_at(&self) -> Instant {
        self.registered_at
    }
}

/// Flow-keyed table of pending handlers.
///
/// Holds at most one descriptor per flow. `take` removes under the shard
/// lock, so racing packets on the same flow see the descriptor at most once.
#[derive(Default)]
pub struct PendingRegistry {
    table: DashMap<FlowKey, HandlerDescriptor>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        PendingRegistry {
            table: DashMap::new(),
        }
    }

    /// Insert or overwrite. Returns the descriptor that was replaced, if any.
    pub fn register(&self, key: FlowKey, descriptor: HandlerDescriptor) -> Option<HandlerDescriptor> {
        self.table.insert(key, descriptor)
    }

    /// Look up and remove in one step.
    pub fn take(&self, key: &FlowKey) -> Option<HandlerDescriptor> {
        self.table.remove(key).map(|(_, descriptor)| descriptor)
    }

    pub fn remove(&self, key: &FlowKey) -> bool {
        self.table.remove(key).is_some()
    }

    pub fn contains(&self, key: &FlowKey) -> bool {
        self.table.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Drop every descriptor registered before `cutoff`. Returns how many went.
    ///
    /// Removal re-checks the timestamp under the shard lock, so a flow that is
    /// re-registered while the sweep runs keeps its fresh descriptor.
    pub fn expire_registered_before(&self, cutoff: Instant) -> usize {
        let stale: Vec<FlowKey> = self
            .table
            .iter()
            .filter(|r| r.value().registered_at() < cutoff)
            .map(|r| *r.key())
            .collect();

        stale
            .iter()
            .filter(|key| {
                self.table
                    .remove_if(key, |_, d| d.registered_at() < cutoff)
                    .is_some()
            })
            .count()
    }

    /// Drop every descriptor older than `max_age`.
    pub fn expire_older_than(&self, max_age: Duration) -> usize {
        match Instant::now().checked_sub(max_age) {
            Some(cutoff) => self.expire_registered_before(cutoff),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn flow(sport: u16) -> FlowKey {
        FlowKey::new(
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(10, 0, 0, 9),
            sport,
            80,
        )
    }

    #[test]
    fn test_take_consumes_once() {
        let registry = PendingRegistry::new();
        registry.register(flow(1), HandlerDescriptor::new(HandlerKind::FS_WATCH, "/etc/hosts"));

        let taken = registry.take(&flow(1)).unwrap();
        assert_eq!(taken.kind, HandlerKind::FS_WATCH);
        assert_eq!(taken.request, b"/etc/hosts");
        assert!(registry.take(&flow(1)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_replaces_existing() {
        let registry = PendingRegistry::new();
        assert!(registry
            .register(flow(1), HandlerDescriptor::new(HandlerKind::FS_WATCH, "a"))
            .is_none());
        let old = registry
            .register(flow(1), HandlerDescriptor::new(HandlerKind(9), "b"))
            .unwrap();
        assert_eq!(old.request, b"a");
        assert_eq!(registry.len(), 1);

        let current = registry.take(&flow(1)).unwrap();
        assert_eq!(current.kind, HandlerKind(9));
        assert_eq!(current.request, b"b");
    }

    #[test]
    fn test_flows_are_directional() {
        let registry = PendingRegistry::new();
        let forward = flow(1);
        let reverse = FlowKey::new(forward.daddr, forward.saddr, forward.dport, forward.sport);
        registry.register(forward, HandlerDescriptor::new(HandlerKind::FS_WATCH, "x"));
        assert!(registry.take(&reverse).is_none());
        assert!(registry.contains(&forward));
    }

    #[test]
    fn test_remove() {
        let registry = PendingRegistry::new();
        registry.register(flow(1), HandlerDescriptor::new(HandlerKind::FS_WATCH, "x"));
        assert!(registry.remove(&flow(1)));
        assert!(!registry.remove(&flow(1)));
    }

    #[test]
    fn test_expire_registered_before() {
        let registry = PendingRegistry::new();
        registry.register(flow(1), HandlerDescriptor::new(HandlerKind::FS_WATCH, "old"));
        thread::sleep(Duration::from_millis(2));
        let cutoff = Instant::now();
        thread::sleep(Duration::from_millis(2));
        registry.register(flow(2), HandlerDescriptor::new(HandlerKind::FS_WATCH, "new"));

        assert_eq!(registry.expire_registered_before(cutoff), 1);
        assert!(!registry.contains(&flow(1)));
        assert!(registry.contains(&flow(2)));
    }

    #[test]
    fn test_expire_older_than_keeps_fresh_entries() {
        let registry = PendingRegistry::new();
        registry.register(flow(1), HandlerDescriptor::new(HandlerKind::FS_WATCH, "x"));
        assert_eq!(registry.expire_older_than(Duration::from_secs(3600)), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_take_yields_one_winner() {
        for _ in 0..50 {
            let registry = PendingRegistry::new();
            registry.register(flow(7), HandlerDescriptor::new(HandlerKind::FS_WATCH, "x"));
            let winners = AtomicUsize::new(0);

            thread::scope(|s| {
                for _ in 0..8 {
                    s.spawn(|| {
                        if registry.take(&flow(7)).is_some() {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            });

            assert_eq!(winners.load(Ordering::SeqCst), 1);
        }
    }
}
