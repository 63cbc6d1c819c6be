//! Capabilities a logger writes to
//!
//! Each external collaborator is a trait injected at construction: the
//! console, durable storage, and a broadcast channel. Stock implementations
//! cover the standard streams, `tracing`, in-memory buffers, files, and a
//! `tokio` broadcast channel.

mod broadcast;
mod buffer;
mod console;
mod storage;

pub use broadcast::{
    BroadcastEvent, BroadcastPayload, BroadcastSink, ChannelBroadcast, DEFAULT_BROADCAST_CAPACITY,
};
pub use buffer::{BufferedConsole, ConsoleLine};
pub use console::{join_line, ConsoleSink, StdConsole, TracingConsole};
pub use storage::{
    categorize_io_error, DiskErrorKind, FileStorage, MemoryStorage, StorageError, StorageSink,
};
