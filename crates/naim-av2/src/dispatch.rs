//! Per-kind response handler registry.
//!
//! Handlers are kept in two typed lists, one per [`ResponseKind`], so each
//! handler receives the concrete response shape it registered for. Handlers
//! run synchronously in the read task, in registration order. The first
//! handler to fail stops dispatch for that response.

use naim_core::error::{Error, HandlerError, Result};

use crate::response::{Response, ResponseKind, SystemStatus, UnknownResponse};

/// Result returned by a response handler.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Handler for system status responses.
pub type SystemStatusHandler = Box<dyn Fn(&SystemStatus) -> HandlerResult + Send + Sync>;

/// Handler for responses with an unmodelled message type.
pub type UnknownResponseHandler = Box<dyn Fn(&UnknownResponse) -> HandlerResult + Send + Sync>;

/// Ordered handler lists for every response kind.
#[derive(Default)]
pub struct Dispatcher {
    system_status: Vec<SystemStatusHandler>,
    unknown: Vec<UnknownResponseHandler>,
}

impl Dispatcher {
    /// Create a registry with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a system status handler.
    pub fn on_system_status<F>(&mut self, handler: F)
    where
        F: Fn(&SystemStatus) -> HandlerResult + Send + Sync + 'static,
    {
        self.system_status.push(Box::new(handler));
    }

    /// Append an unknown-response handler.
    pub fn on_unknown<F>(&mut self, handler: F)
    where
        F: Fn(&UnknownResponse) -> HandlerResult + Send + Sync + 'static,
    {
        self.unknown.push(Box::new(handler));
    }

    /// Remove every handler of one kind.
    pub fn clear(&mut self, kind: ResponseKind) {
        match kind {
            ResponseKind::SystemStatus => self.system_status.clear(),
            ResponseKind::Unknown => self.unknown.clear(),
        }
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: ResponseKind) -> usize {
        match kind {
            ResponseKind::SystemStatus => self.system_status.len(),
            ResponseKind::Unknown => self.unknown.len(),
        }
    }

    /// Invoke every handler registered for the response's kind.
    pub fn dispatch(&self, response: &Response) -> Result<()> {
        let kind = response.kind();
        let code = response.code();
        let (ran, outcome) = match response {
            Response::SystemStatus(status) => call_all(&self.system_status, status),
            Response::Unknown(unknown) => call_all(&self.unknown, unknown),
        };

        tracing::debug!(
            kind = kind.name(),
            code,
            handlers = ran,
            ok = outcome.is_ok(),
            "Dispatched response"
        );

        outcome.map_err(|source| Error::Handler {
            kind: kind.name(),
            code,
            source,
        })
    }
}

/// Run handlers in order until one fails. Returns how many ran, the failing
/// one included.
fn call_all<T: ?Sized>(
    handlers: &[Box<dyn Fn(&T) -> HandlerResult + Send + Sync>],
    value: &T,
) -> (usize, HandlerResult) {
    for (index, handler) in handlers.iter().enumerate() {
        if let Err(e) = handler(value) {
            return (index + 1, Err(e));
        }
    }
    (handlers.len(), Ok(()))
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("system_status", &self.system_status.len())
            .field("unknown", &self.unknown.len())
            .finish()
    }
}
