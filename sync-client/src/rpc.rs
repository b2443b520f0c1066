//! Synchronized remote procedure calls.
//!
//! The leader turns a call into an event `offset` seconds in the future;
//! every node dispatches it from its own delivery stream through a
//! [`CallTable`] when it falls due. Only functions registered in the table
//! can run, and their arguments are checked against the handler's type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lockstep_sync_types::{EventId, SyncError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::delivery::{Delivery, DeliveryStream};
use crate::node::GroupNode;
use crate::transport::GroupTransport;

/// Errors from building or dispatching a call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No handler is registered under this name.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Arguments did not match the handler's type.
    #[error("bad arguments for {function}: {source}")]
    BadArguments {
        /// Function name.
        function: String,
        /// Decoding error.
        source: serde_json::Error,
    },

    /// The handler itself failed.
    #[error("{function} failed: {message}")]
    Handler {
        /// Function name.
        function: String,
        /// Handler error, rendered.
        message: String,
    },

    /// Payload was not a call.
    #[error("failed to decode call: {0}")]
    Decode(serde_json::Error),

    /// Call could not be encoded.
    #[error("failed to encode call: {0}")]
    Encode(serde_json::Error),

    /// Scheduling failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// A call as carried in an event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcCall {
    /// Registered function name.
    pub function: String,
    /// Arguments, decoded by the handler.
    pub args: serde_json::Value,
}

impl RpcCall {
    /// Build a call from typed arguments.
    pub fn new(function: impl Into<String>, args: impl Serialize) -> Result<Self, RpcError> {
        Ok(Self {
            function: function.into(),
            args: serde_json::to_value(args).map_err(RpcError::Encode)?,
        })
    }

    /// Encode as an event payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RpcError> {
        serde_json::to_vec(self).map_err(RpcError::Encode)
    }

    /// Decode an event payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RpcError> {
        serde_json::from_slice(bytes).map_err(RpcError::Decode)
    }
}

type Handler = Box<dyn Fn(serde_json::Value) -> Result<(), RpcError> + Send + Sync>;

/// Functions that may be invoked by group calls.
#[derive(Default)]
pub struct CallTable {
    handlers: HashMap<String, Handler>,
}

impl CallTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous one.
    pub fn register<A, E, F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        A: DeserializeOwned,
        E: fmt::Display,
        F: Fn(A) -> Result<(), E> + Send + Sync + 'static,
    {
        let name = name.into();
        let function = name.clone();
        self.handlers.insert(
            name,
            Box::new(move |args| {
                let args: A =
                    serde_json::from_value(args).map_err(|source| RpcError::BadArguments {
                        function: function.clone(),
                        source,
                    })?;
                handler(args).map_err(|e| RpcError::Handler {
                    function: function.clone(),
                    message: e.to_string(),
                })
            }),
        );
        self
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the handler for `call`.
    pub fn dispatch(&self, call: RpcCall) -> Result<(), RpcError> {
        let handler = self
            .handlers
            .get(&call.function)
            .ok_or_else(|| RpcError::UnknownFunction(call.function.clone()))?;
        handler(call.args)
    }
}

impl fmt::Debug for CallTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallTable")
            .field("functions", &self.names())
            .finish()
    }
}

/// Group RPC over one node.
pub struct GroupRpc<T: GroupTransport> {
    node: Arc<GroupNode<T>>,
    table: CallTable,
}

impl<T: GroupTransport> GroupRpc<T> {
    /// Wrap a node with a call table.
    pub fn new(node: Arc<GroupNode<T>>, table: CallTable) -> Self {
        Self { node, table }
    }

    /// The wrapped node.
    pub fn node(&self) -> &Arc<GroupNode<T>> {
        &self.node
    }

    /// Schedule `function(args)` to run on every node `offset` seconds from
    /// now. Offsets below the configured threshold are allowed but logged,
    /// since peers with higher ping may receive the call after it is due.
    pub fn call(
        &self,
        offset: f64,
        function: &str,
        args: impl Serialize,
    ) -> Result<EventId, RpcError> {
        let threshold = self.node.config().low_offset_warning_secs;
        if offset < threshold {
            tracing::warn!(
                "Scheduling {} with low offset {:.3}s (< {:.3}s); peers may run it late",
                function,
                offset,
                threshold
            );
        }

        let payload = RpcCall::new(function, args)?.to_bytes()?;
        let id = self.node.schedule(self.node.now() + offset, payload)?;
        tracing::debug!("Scheduled call {} as {} in {:.3}s", function, id, offset);
        Ok(id)
    }

    /// Decode and run one delivered call.
    pub fn dispatch(&self, delivery: &Delivery<'_>) -> Result<(), RpcError> {
        let call = RpcCall::from_bytes(delivery.payload())?;
        tracing::debug!(
            "Dispatching {} ({}) {:.3}s late",
            call.function,
            delivery.id(),
            delivery.lateness()
        );
        self.table.dispatch(call)
    }

    /// Wait for the next delivery and dispatch it.
    pub async fn dispatch_next(&self, stream: &mut DeliveryStream) -> Result<(), RpcError> {
        let delivery = stream.next().await;
        self.dispatch(&delivery)
    }

    /// Dispatch deliveries forever. Failures are logged and skipped.
    pub async fn run(&self, mut stream: DeliveryStream) {
        loop {
            if let Err(e) = self.dispatch_next(&mut stream).await {
                tracing::warn!("Dropped group call: {}", e);
            }
        }
    }
}
