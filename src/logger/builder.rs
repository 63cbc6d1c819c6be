//! Builder for [`Logger`]

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use super::{Logger, Settings};
use crate::client::ClientRegistry;
use crate::config::{Capacity, LoggerConfig};
use crate::event::EventStore;
use crate::sinks::{BroadcastSink, ConsoleSink, FileStorage, StdConsole, StorageSink};

/// Assembles a [`Logger`] from a configuration and its capabilities
///
/// Sinks left unset are unavailable, except the console which defaults to
/// [`StdConsole`].
#[derive(Default)]
pub struct LoggerBuilder {
    config: LoggerConfig,
    console: Option<Arc<dyn ConsoleSink>>,
    storage: Option<Arc<dyn StorageSink>>,
    broadcast: Option<Arc<dyn BroadcastSink>>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = Some(console);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn StorageSink>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Persist into `<dir>/<storage_key>.json`
    pub fn file_storage(self, dir: impl Into<PathBuf>) -> Self {
        self.storage(Arc::new(FileStorage::new(dir)))
    }

    pub fn broadcast(mut self, broadcast: Arc<dyn BroadcastSink>) -> Self {
        self.broadcast = Some(broadcast);
        self
    }

    pub fn max_events(mut self, capacity: Capacity) -> Self {
        self.config.max_events = capacity.limit();
        self
    }

    pub fn logging_enabled(mut self, enabled: bool) -> Self {
        self.config.logging_enabled = enabled;
        self
    }

    pub fn suppress_native(mut self, suppress: bool) -> Self {
        self.config.suppress_native = suppress;
        self
    }

    pub fn suppress_console(mut self, suppress: bool) -> Self {
        self.config.suppress_console = suppress;
        self
    }

    pub fn enable_dispatch_events(mut self, enabled: bool) -> Self {
        self.config.enable_dispatch_events = enabled;
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.config.storage_key = key.into();
        self
    }

    pub fn event_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.event_namespace = namespace.into();
        self
    }

    pub fn max_dispatch_depth(mut self, depth: usize) -> Self {
        self.config.max_dispatch_depth = depth;
        self
    }

    pub fn build(self) -> Logger {
        let config = self.config;
        let console = self
            .console
            .unwrap_or_else(|| Arc::new(StdConsole) as Arc<dyn ConsoleSink>);

        let store = EventStore::new(Arc::clone(&console), self.storage)
            .with_key(config.storage_key.clone())
            .with_capacity(config.capacity());

        tracing::debug!(
            storage = store.has_storage(),
            broadcast = self.broadcast.is_some(),
            capacity = ?config.capacity(),
            "Building logger"
        );

        Logger {
            settings: RwLock::new(Settings {
                logging_enabled: config.logging_enabled,
                suppress_native: config.suppress_native,
                suppress_console: config.suppress_console,
                enable_dispatch_events: config.enable_dispatch_events,
            }),
            store: Mutex::new(store),
            clients: RwLock::new(ClientRegistry::new()),
            console,
            broadcast: self.broadcast,
            event_namespace: config.event_namespace,
            max_dispatch_depth: config.max_dispatch_depth,
        }
    }
}
