pub mod fs_watch;

use std::sync::Arc;

use crate::engine::{dispatcher::HandlerTable, registry::HandlerKind};
use fs_watch::{FsWatchHandler, WatchStore};

/// Handler table with every handler kind this crate implements.
pub fn builtin_handlers(store: Arc<WatchStore>) -> HandlerTable {
    let mut table = HandlerTable::new();
    table.insert(HandlerKind::FS_WATCH, Arc::new(FsWatchHandler::new(store)));
    table
}
