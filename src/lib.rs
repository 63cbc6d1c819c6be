//! fanlog - a logging facade that fans each call out to many destinations
//!
//! A [`Logger`] accepts `log`/`info`/`warn`/`error` calls and, subject to its
//! settings, records them in a bounded event history (mirrored to durable
//! storage), writes a formatted console line, forwards the call to every
//! registered [`Client`], and publishes a broadcast event.
//!
//! ```no_run
//! use std::sync::Arc;
//! use fanlog::{Client, Logger, MemoryStorage};
//!
//! let logger = Logger::builder()
//!     .storage(Arc::new(MemoryStorage::new()))
//!     .build();
//!
//! let client = Client::builder("audit")
//!     .log(|_, _| Ok(()))
//!     .info(|_, _| Ok(()))
//!     .warn(|_, _| Ok(()))
//!     .error(|msg, _| {
//!         eprintln!("alert: {msg}");
//!         Ok(())
//!     })
//!     .build();
//!
//! logger.add_client(&client);
//! logger.info("service started").warn("disk at 90%");
//! ```

pub mod client;
pub mod config;
pub mod event;
pub mod logger;
pub mod logging;
pub mod sinks;

pub use client::{
    implements, Admission, Capabilities, Client, ClientBuilder, ClientError, ClientRegistry,
    LogClient, REQUIRED_OPERATIONS,
};
pub use config::{Capacity, ConfigError, LoggerConfig, Setting};
pub use event::{EventId, EventRecord, EventStore, Severity};
pub use logger::{global, Logger, LoggerBuilder};
pub use sinks::{
    BroadcastEvent, BroadcastPayload, BroadcastSink, BufferedConsole, ChannelBroadcast,
    ConsoleLine, ConsoleSink, FileStorage, MemoryStorage, StdConsole, StorageError, StorageSink,
    TracingConsole,
};
