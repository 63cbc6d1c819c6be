//! Subscriber clients
//!
//! A [`Client`] receives every dispatched log call through one handler per
//! severity. Clients are shared as `Arc<Client>` and compared by pointer
//! identity, so two structurally identical clients built separately are
//! distinct subscribers.
//!
//! Clients come from two places:
//! - [`Client::builder`] assembles one from closures. Operations may be left
//!   out, which produces a candidate the registry will refuse.
//! - [`Client::from_log_client`] wraps any type implementing [`LogClient`].

mod registry;
pub mod validator;

pub use registry::{Admission, ClientRegistry};
pub use validator::{implements, Capabilities, REQUIRED_OPERATIONS};

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::event::Severity;

/// Handler invoked with `(message, extra)`
pub type Handler = Arc<dyn Fn(&Value, &[Value]) -> anyhow::Result<()> + Send + Sync>;

/// Failure of a client while handling a dispatched call
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("client {client} failed in {operation}(): {source}")]
    Failed {
        client: String,
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("client {client} panicked in {operation}(): {message}")]
    Panicked {
        client: String,
        operation: &'static str,
        message: String,
    },

    #[error("client {client} does not provide {operation}()")]
    MissingOperation {
        client: String,
        operation: &'static str,
    },
}

/// Typed subscriber contract
///
/// Implementors always provide all four operations.
pub trait LogClient: Send + Sync {
    fn log(&self, message: &Value, extra: &[Value]) -> anyhow::Result<()>;
    fn info(&self, message: &Value, extra: &[Value]) -> anyhow::Result<()>;
    fn warn(&self, message: &Value, extra: &[Value]) -> anyhow::Result<()>;
    fn error(&self, message: &Value, extra: &[Value]) -> anyhow::Result<()>;
}

/// A subscriber handle
pub struct Client {
    name: String,
    /// Indexed in `Severity::ALL` order
    handlers: [Option<Handler>; 4],
}

fn slot(severity: Severity) -> usize {
    match severity {
        Severity::Log => 0,
        Severity::Info => 1,
        Severity::Warn => 2,
        Severity::Error => 3,
    }
}

impl Client {
    /// Start building a client from closures
    pub fn builder(name: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            name: name.into(),
            handlers: [None, None, None, None],
        }
    }

    /// Wrap a [`LogClient`] implementation
    pub fn from_log_client<C: LogClient + 'static>(name: impl Into<String>, client: C) -> Arc<Client> {
        let client = Arc::new(client);
        let log = Arc::clone(&client);
        let info = Arc::clone(&client);
        let warn = Arc::clone(&client);
        let error = client;
        Client::builder(name)
            .log(move |m, x| log.log(m, x))
            .info(move |m, x| info.info(m, x))
            .warn(move |m, x| warn.warn(m, x))
            .error(move |m, x| error.error(m, x))
            .build()
    }

    /// Name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the operations this client provides
    pub fn operations(&self) -> Vec<&'static str> {
        Severity::ALL
            .into_iter()
            .filter(|s| self.handlers[slot(*s)].is_some())
            .map(|s| s.operation())
            .collect()
    }

    /// Call the handler for `severity`
    ///
    /// Returned errors and panics are both reported as [`ClientError`].
    pub fn invoke(&self, severity: Severity, message: &Value, extra: &[Value]) -> Result<(), ClientError> {
        let operation = severity.operation();
        let Some(handler) = &self.handlers[slot(severity)] else {
            return Err(ClientError::MissingOperation {
                client: self.name.clone(),
                operation,
            });
        };

        match catch_unwind(AssertUnwindSafe(|| handler(message, extra))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(ClientError::Failed {
                client: self.name.clone(),
                operation,
                source,
            }),
            Err(panic) => {
                let message = if let Some(msg) = panic.downcast_ref::<&'static str>() {
                    (*msg).to_string()
                } else if let Some(msg) = panic.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                };
                Err(ClientError::Panicked {
                    client: self.name.clone(),
                    operation,
                    message,
                })
            }
        }
    }
}

impl Capabilities for Client {
    fn provides(&self, operation: &str) -> bool {
        Severity::ALL
            .into_iter()
            .find(|s| s.operation() == operation)
            .map(|s| self.handlers[slot(s)].is_some())
            .unwrap_or(false)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.name)
            .field("operations", &self.operations())
            .finish()
    }
}

/// Builder for [`Client`]
pub struct ClientBuilder {
    name: String,
    handlers: [Option<Handler>; 4],
}

impl ClientBuilder {
    /// Set the handler for one severity
    pub fn on<F>(mut self, severity: Severity, handler: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers[slot(severity)] = Some(Arc::new(handler));
        self
    }

    pub fn log<F>(self, handler: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(Severity::Log, handler)
    }

    pub fn info<F>(self, handler: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(Severity::Info, handler)
    }

    pub fn warn<F>(self, handler: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(Severity::Warn, handler)
    }

    pub fn error<F>(self, handler: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(Severity::Error, handler)
    }

    /// Give every missing operation a handler that does nothing
    pub fn ignore_missing(mut self) -> Self {
        for handler in self.handlers.iter_mut() {
            if handler.is_none() {
                *handler = Some(Arc::new(|_: &Value, _: &[Value]| -> anyhow::Result<()> { Ok(()) }));
            }
        }
        self
    }

    pub fn build(self) -> Arc<Client> {
        Arc::new(Client {
            name: self.name,
            handlers: self.handlers,
        })
    }
}
