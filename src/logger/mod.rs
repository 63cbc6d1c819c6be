//! The logging facade
//!
//! [`Logger`] owns one [`EventStore`](crate::event::EventStore) and one
//! [`ClientRegistry`], and runs every log call through the same pipeline:
//!
//! ```text
//! log/info/warn/error(message, extra)
//!     │
//!     ├─ logging disabled? ──► return
//!     ├─ nested too deep?  ──► drop (traced), return
//!     ├─ !suppress_native  ──► EventStore::append ──► storage mirror (best effort)
//!     ├─ !suppress_console ──► console "[S] <timestamp>: message extra..."
//!     ├─ each client (snapshot, insertion order)
//!     │      └─ failure/panic ──► console ERROR naming the client, continue
//!     └─ broadcast sink && enable_dispatch_events ──► "<namespace>S" event
//! ```
//!
//! Client fan-out and broadcast do not depend on `suppress_native` or
//! `suppress_console`.

mod builder;
mod reentry;

pub use builder::LoggerBuilder;

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, RwLock};

use chrono::Utc;
use serde_json::{json, Value};

use crate::client::{Admission, Client, ClientRegistry, REQUIRED_OPERATIONS};
use crate::config::{expect_bool, Capacity, ConfigError, LoggerConfig, Setting};
use crate::event::{format_timestamp, render_value, EventRecord, EventStore, Severity};
use crate::sinks::{BroadcastEvent, BroadcastPayload, BroadcastSink, ConsoleSink, FileStorage};
use reentry::DispatchGuard;

/// Boolean switches consulted on every call
#[derive(Debug, Clone, Copy)]
struct Settings {
    logging_enabled: bool,
    suppress_native: bool,
    suppress_console: bool,
    enable_dispatch_events: bool,
}

impl Settings {
    fn flag_mut(&mut self, setting: Setting) -> Option<&mut bool> {
        match setting {
            Setting::LoggingEnabled => Some(&mut self.logging_enabled),
            Setting::SuppressNative => Some(&mut self.suppress_native),
            Setting::SuppressConsole => Some(&mut self.suppress_console),
            Setting::EnableDispatchEvents => Some(&mut self.enable_dispatch_events),
            Setting::MaxEvents => None,
        }
    }
}

/// Logging facade with a persisted event history and pluggable sinks
///
/// All methods take `&self`; a `Logger` can be shared behind an `Arc` and
/// called from inside client handlers.
pub struct Logger {
    settings: RwLock<Settings>,
    store: Mutex<EventStore>,
    clients: RwLock<ClientRegistry>,
    console: Arc<dyn ConsoleSink>,
    broadcast: Option<Arc<dyn BroadcastSink>>,
    event_namespace: String,
    max_dispatch_depth: usize,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Logger writing to the standard streams, without storage or broadcast
    pub fn new() -> Self {
        LoggerBuilder::new().build()
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Logger writing to the standard streams and persisting under the
    /// configured storage directory
    pub fn from_config(config: LoggerConfig) -> Self {
        let dir = config.storage_path();
        LoggerBuilder::new()
            .storage(Arc::new(FileStorage::new(dir)))
            .config(config)
            .build()
    }

    // ---- logging ----------------------------------------------------------

    pub fn log(&self, message: impl Into<Value>) -> &Self {
        self.emit(Severity::Log, message.into(), &[])
    }

    pub fn info(&self, message: impl Into<Value>) -> &Self {
        self.emit(Severity::Info, message.into(), &[])
    }

    pub fn warn(&self, message: impl Into<Value>) -> &Self {
        self.emit(Severity::Warn, message.into(), &[])
    }

    pub fn error(&self, message: impl Into<Value>) -> &Self {
        self.emit(Severity::Error, message.into(), &[])
    }

    pub fn log_with(&self, message: impl Into<Value>, extra: &[Value]) -> &Self {
        self.emit(Severity::Log, message.into(), extra)
    }

    pub fn info_with(&self, message: impl Into<Value>, extra: &[Value]) -> &Self {
        self.emit(Severity::Info, message.into(), extra)
    }

    pub fn warn_with(&self, message: impl Into<Value>, extra: &[Value]) -> &Self {
        self.emit(Severity::Warn, message.into(), extra)
    }

    pub fn error_with(&self, message: impl Into<Value>, extra: &[Value]) -> &Self {
        self.emit(Severity::Error, message.into(), extra)
    }

    /// Run one call through the pipeline
    ///
    /// Returns `self` whether or not the call was recorded.
    pub fn emit(&self, severity: Severity, message: Value, extra: &[Value]) -> &Self {
        let settings = self.current_settings();
        if !settings.logging_enabled {
            return self;
        }

        let Some(_guard) = DispatchGuard::enter(self.max_dispatch_depth) else {
            tracing::warn!(
                severity = %severity,
                depth = reentry::current_depth(),
                max_depth = self.max_dispatch_depth,
                "Dropping log call nested too deeply inside client dispatch"
            );
            return self;
        };

        let record = if settings.suppress_native {
            None
        } else {
            self.lock_store().append(severity, message.clone())
        };
        let timestamp = record.map(|r| r.timestamp).unwrap_or_else(Utc::now);

        if !settings.suppress_console {
            let line = format!(
                "[{}] {}: {}",
                severity,
                format_timestamp(&timestamp),
                render_value(&message)
            );
            self.console.write(severity, &line, extra);
        }

        for client in self.client_snapshot() {
            if let Err(e) = client.invoke(severity, &message, extra) {
                tracing::warn!(client = %client.name(), error = %e, "Client failed during dispatch");
                self.console.error(
                    &format!("Client error in {}():", severity.operation()),
                    &[json!(client.name()), json!(e.to_string())],
                );
            }
        }

        if settings.enable_dispatch_events {
            if let Some(broadcast) = &self.broadcast {
                broadcast.dispatch(&BroadcastEvent {
                    name: format!("{}{}", self.event_namespace, severity.as_str()),
                    severity,
                    payload: BroadcastPayload {
                        message,
                        extra: extra.to_vec(),
                        timestamp,
                    },
                });
            }
        }

        self
    }

    // ---- clients ----------------------------------------------------------

    /// Check a candidate against the client contract without registering it
    pub fn is_valid_client(&self, candidate: Option<&Client>) -> bool {
        ClientRegistry::validate(candidate)
    }

    /// Register a client
    ///
    /// Refusals are reported through the pipeline: a duplicate as WARN, an
    /// incomplete client as ERROR. A successful addition is itself logged.
    pub fn add_client(&self, candidate: &Arc<Client>) -> bool {
        let admission = self.clients_write().admit(candidate);
        let name = json!(candidate.name());

        match admission {
            Admission::Added => {
                self.log_with("A new client has been added.", &[name]);
                true
            }
            Admission::Duplicate => {
                self.warn_with("Client is already added.", &[name]);
                false
            }
            Admission::Invalid => {
                self.error_with(
                    format!(
                        "Failed to add client. Invalid client interface. Expected the following methods: {}",
                        REQUIRED_OPERATIONS.join(", ")
                    ),
                    &[name],
                );
                false
            }
        }
    }

    /// Unregister a client
    pub fn remove_client(&self, client: &Arc<Client>) -> bool {
        let removed = self.clients_write().remove(client);
        if !removed {
            self.console.warn("Client not found.", &[json!(client.name())]);
        }
        removed
    }

    /// Registered clients in insertion order
    ///
    /// With none registered, a warning goes to the console (not the pipeline).
    pub fn clients(&self) -> Vec<Arc<Client>> {
        let clients = self.client_snapshot();
        if clients.is_empty() {
            self.console.warn("No clients available.", &[]);
        }
        clients
    }

    pub fn remove_all_clients(&self) {
        self.clients_write().clear();
    }

    // ---- events and console -----------------------------------------------

    /// Recorded events, oldest first
    pub fn events(&self) -> Vec<EventRecord> {
        self.lock_store().all()
    }

    pub fn clear_event_log(&self) -> &Self {
        self.lock_store().clear();
        self
    }

    /// Clear the console display only
    pub fn clear_console(&self) -> &Self {
        self.console.clear();
        self
    }

    pub fn clear_all(&self) -> &Self {
        self.clear_event_log().clear_console()
    }

    // ---- settings ---------------------------------------------------------

    pub fn logging_enabled(&self) -> bool {
        self.current_settings().logging_enabled
    }

    pub fn suppress_native(&self) -> bool {
        self.current_settings().suppress_native
    }

    pub fn suppress_console(&self) -> bool {
        self.current_settings().suppress_console
    }

    pub fn enable_dispatch_events(&self) -> bool {
        self.current_settings().enable_dispatch_events
    }

    pub fn max_events(&self) -> Capacity {
        self.lock_store().capacity()
    }

    pub fn set_logging_enabled(&self, enabled: bool) {
        self.set_flag(Setting::LoggingEnabled, enabled);
    }

    pub fn set_suppress_native(&self, suppress: bool) {
        self.set_flag(Setting::SuppressNative, suppress);
    }

    pub fn set_suppress_console(&self, suppress: bool) {
        self.set_flag(Setting::SuppressConsole, suppress);
    }

    pub fn set_enable_dispatch_events(&self, enabled: bool) {
        self.set_flag(Setting::EnableDispatchEvents, enabled);
    }

    /// Change the capacity bound, evicting the oldest events if it shrinks
    pub fn set_max_events(&self, capacity: Capacity) {
        self.lock_store().set_capacity(capacity);
    }

    /// Change a setting from a dynamically typed value
    ///
    /// The four flags take a JSON boolean, `max_events` takes `null` or a
    /// non-negative integer. On error the previous value is kept.
    pub fn configure(&self, name: &str, value: &Value) -> Result<(), ConfigError> {
        let setting: Setting = name.parse()?;
        match setting {
            Setting::MaxEvents => self.set_max_events(Capacity::from_value(value)?),
            flag => self.set_flag(flag, expect_bool(flag, value)?),
        }
        Ok(())
    }

    /// Read a setting as a JSON value
    pub fn setting(&self, name: &str) -> Result<Value, ConfigError> {
        let setting: Setting = name.parse()?;
        if setting == Setting::MaxEvents {
            return Ok(match self.max_events().limit() {
                Some(limit) => json!(limit),
                None => Value::Null,
            });
        }
        let mut settings = self.current_settings();
        Ok(settings.flag_mut(setting).map(|f| json!(*f)).unwrap_or(Value::Null))
    }

    pub fn has_storage(&self) -> bool {
        self.lock_store().has_storage()
    }

    pub fn has_broadcast(&self) -> bool {
        self.broadcast.is_some()
    }

    // ---- internals --------------------------------------------------------

    fn set_flag(&self, setting: Setting, value: bool) {
        let mut settings = self.settings.write().unwrap_or_else(|p| p.into_inner());
        if let Some(flag) = settings.flag_mut(setting) {
            *flag = value;
        }
    }

    fn current_settings(&self) -> Settings {
        *self.settings.read().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_store(&self) -> MutexGuard<'_, EventStore> {
        self.store.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn clients_write(&self) -> std::sync::RwLockWriteGuard<'_, ClientRegistry> {
        self.clients.write().unwrap_or_else(|p| p.into_inner())
    }

    fn client_snapshot(&self) -> Vec<Arc<Client>> {
        self.clients
            .read()
            .map(|c| c.all())
            .unwrap_or_else(|p| p.into_inner().all())
    }
}

/// Process-wide logger writing to the standard streams
///
/// Created on first use without storage or broadcast. Build a dedicated
/// [`Logger`] when those are needed.
pub fn global() -> &'static Logger {
    static GLOBAL: OnceLock<Logger> = OnceLock::new();
    GLOBAL.get_or_init(Logger::new)
}
