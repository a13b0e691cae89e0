//! Chain sessions: capability traits for the RPC transport and the
//! process-wide registry that shares one connection per network.
//!
//! The transport is injected so the registry runs against a real node
//! (`ws-native` feature → `native::WsTransport`) or an in-memory double in
//! tests. Everything here is single-threaded (`Rc`, `?Send` futures), which
//! matches the browser event loop and a tokio `LocalSet`.

pub mod registry;

#[cfg(feature = "ws-native")]
pub mod native;

use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SessionError;
use crate::shared::NetworkId;
use crate::wallet::Signer;

pub use registry::{SessionRegistry, SessionRegistryBuilder};

// ─── Capability traits ───────────────────────────────────────────────────────

/// Opens chain RPC connections.
#[async_trait(?Send)]
pub trait ChainTransport {
    /// Connect to `url` and complete the RPC handshake.
    async fn connect(&self, url: &str) -> Result<Rc<dyn ChainApi>, SessionError>;
}

/// A live chain RPC connection.
pub trait ChainApi {
    /// Whether the connection is still open. Turns `false` once the peer
    /// closes it or the link fails; the registry then reconnects on the
    /// next `acquire`.
    fn is_connected(&self) -> bool;

    /// Close the connection. Must be idempotent.
    fn disconnect(&self);

    /// Bind (or with `None`, unbind) the signer used for transactions.
    fn set_signer(&self, signer: Option<Rc<dyn Signer>>);

    fn signer(&self) -> Option<Rc<dyn Signer>>;
}

// ─── ChainHandle ─────────────────────────────────────────────────────────────

/// Shared reference to a network's live connection.
///
/// Every holder of a network receives a clone of the same connection.
#[derive(Clone)]
pub struct ChainHandle {
    network: NetworkId,
    api: Rc<dyn ChainApi>,
}

impl ChainHandle {
    pub(crate) fn new(network: NetworkId, api: Rc<dyn ChainApi>) -> Self {
        Self { network, api }
    }

    pub fn network(&self) -> &NetworkId {
        &self.network
    }

    pub fn api(&self) -> &Rc<dyn ChainApi> {
        &self.api
    }

    /// Whether both handles point at the same underlying connection.
    pub fn ptr_eq(&self, other: &ChainHandle) -> bool {
        Rc::ptr_eq(&self.api, &other.api)
    }

    pub fn set_signer(&self, signer: Option<Rc<dyn Signer>>) {
        self.api.set_signer(signer);
    }

    pub fn signer(&self) -> Option<Rc<dyn Signer>> {
        self.api.signer()
    }
}

impl fmt::Debug for ChainHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainHandle")
            .field("network", &self.network)
            .field("api", &Rc::as_ptr(&self.api))
            .finish()
    }
}

// ─── ConnectionInfo ──────────────────────────────────────────────────────────

/// Snapshot of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub network: NetworkId,
    pub url: String,
    pub holders: usize,
    /// `None` while the connection attempt is still in flight.
    pub connected_at: Option<DateTime<Utc>>,
}

impl ConnectionInfo {
    pub fn is_live(&self) -> bool {
        self.connected_at.is_some()
    }
}
