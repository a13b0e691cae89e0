//! Reference-counted registry of chain connections, keyed by network.
//!
//! Callers never get an exclusive lease on a connection: concurrent
//! `acquire`s for one network join the same in-flight attempt and resolve to
//! the same handle, and the connection is closed when the last holder
//! releases it. A connection that dropped on its own is replaced on the next
//! `acquire`, keeping its holders.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use futures_util::future::{FutureExt, LocalBoxFuture, Shared};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::session::{ChainApi, ChainHandle, ChainTransport, ConnectionInfo};
use crate::shared::NetworkId;

type ConnectAttempt = Shared<LocalBoxFuture<'static, Result<Rc<dyn ChainApi>, SessionError>>>;

enum EntryState {
    Connecting(ConnectAttempt),
    Live(Rc<dyn ChainApi>),
}

struct ConnectionEntry {
    state: EntryState,
    holders: usize,
    /// Distinguishes this attempt from a later one on the same network.
    generation: u64,
    /// Generation the entry was created with. Reconnects bump `generation`
    /// but carry the holders over, so claims from `lineage..=generation`
    /// all count against this entry.
    lineage: u64,
    url: String,
    connected_at: Option<DateTime<Utc>>,
}

impl ConnectionEntry {
    fn owns(&self, generation: u64) -> bool {
        (self.lineage..=self.generation).contains(&generation)
    }

    fn close(self) {
        match self.state {
            EntryState::Live(api) => api.disconnect(),
            EntryState::Connecting(attempt) => {
                if let Some(Ok(api)) = attempt.peek() {
                    api.disconnect();
                }
            }
        }
    }
}

enum Claim {
    Live(Rc<dyn ChainApi>),
    Connecting(ConnectAttempt, u64),
}

enum Promotion {
    Ready(ChainHandle),
    /// Our attempt was replaced by a reconnect; wait on that one instead.
    Rejoin(ConnectAttempt, u64),
}

/// Process-wide map from network id to a shared chain connection.
///
/// Construct one per app and hand it out as `Rc<SessionRegistry>`.
pub struct SessionRegistry {
    transport: Rc<dyn ChainTransport>,
    endpoints: HashMap<NetworkId, String>,
    entries: RefCell<HashMap<NetworkId, ConnectionEntry>>,
    generation: Cell<u64>,
}

impl SessionRegistry {
    pub fn builder() -> SessionRegistryBuilder {
        SessionRegistryBuilder::default()
    }

    /// A registry serving every network listed in `config`.
    pub fn from_config(config: &SessionConfig, transport: Rc<dyn ChainTransport>) -> Self {
        config
            .networks
            .iter()
            .fold(Self::builder(), |builder, n| {
                builder.endpoint(n.id.clone(), &n.url)
            })
            .build(transport)
    }

    /// Get the shared connection for `network`, connecting if needed.
    ///
    /// Counts as one holder until matched by [`release`](Self::release).
    /// Callers arriving while a connection attempt is in flight join it
    /// instead of starting another. If the attempt fails, every joined caller
    /// sees the error and the entry is removed so the next call retries.
    ///
    /// A live entry whose connection has dropped is reconnected in place:
    /// its holder count is kept and the new attempt is shared like any other.
    ///
    /// Dropping the returned future before it resolves gives the claim back.
    pub async fn acquire(&self, network: &NetworkId) -> Result<ChainHandle, SessionError> {
        let (mut attempt, mut generation) = match self.claim(network)? {
            Claim::Live(api) => return Ok(ChainHandle::new(network.clone(), api)),
            Claim::Connecting(attempt, generation) => (attempt, generation),
        };

        loop {
            let guard = ClaimGuard {
                registry: self,
                network,
                generation,
            };
            let result = attempt.await;
            std::mem::forget(guard);

            match result {
                Ok(api) => match self.promote(network, generation, api)? {
                    Promotion::Ready(handle) => return Ok(handle),
                    Promotion::Rejoin(next, next_generation) => {
                        attempt = next;
                        generation = next_generation;
                    }
                },
                Err(e) => {
                    self.abandon(network, generation, &e);
                    return Err(e);
                }
            }
        }
    }

    /// Give back one claim on `network`. The last release disconnects.
    ///
    /// Releasing a network with no open session is a no-op.
    pub fn release(&self, network: &NetworkId) {
        self.release_claim(network, None);
    }

    pub fn endpoint(&self, network: &NetworkId) -> Option<&str> {
        self.endpoints.get(network).map(String::as_str)
    }

    pub fn contains(&self, network: &NetworkId) -> bool {
        self.entries.borrow().contains_key(network)
    }

    /// Whether `network` has an established connection that is still open.
    pub fn is_live(&self, network: &NetworkId) -> bool {
        matches!(
            self.entries.borrow().get(network).map(|e| &e.state),
            Some(EntryState::Live(api)) if api.is_connected()
        )
    }

    /// Number of outstanding claims on `network` (0 if none).
    pub fn holders(&self, network: &NetworkId) -> usize {
        self.entries
            .borrow()
            .get(network)
            .map(|e| e.holders)
            .unwrap_or(0)
    }

    pub fn connection_info(&self, network: &NetworkId) -> Option<ConnectionInfo> {
        self.entries.borrow().get(network).map(|e| ConnectionInfo {
            network: network.clone(),
            url: e.url.clone(),
            holders: e.holders,
            connected_at: e.connected_at,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Close every session regardless of holders.
    ///
    /// Callers still waiting on an attempt get an error when it resolves.
    pub fn clear(&self) {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        for (network, entry) in entries {
            tracing::info!("Closing session for {}", network);
            entry.close();
        }
    }

    // ── internals ────────────────────────────────────────────────────────

    fn claim(&self, network: &NetworkId) -> Result<Claim, SessionError> {
        let mut dropped = None;
        let claim = self.claim_entry(network, &mut dropped);
        if let Some(api) = dropped {
            api.disconnect();
        }
        claim
    }

    /// Count a new holder, starting or restarting the connection as needed.
    /// A replaced dead connection is handed back through `dropped` so it can
    /// be closed outside the borrow.
    fn claim_entry(
        &self,
        network: &NetworkId,
        dropped: &mut Option<Rc<dyn ChainApi>>,
    ) -> Result<Claim, SessionError> {
        let mut entries = self.entries.borrow_mut();

        if let Some(entry) = entries.get_mut(network) {
            entry.holders += 1;
            tracing::debug!("Joining session for {} ({} holders)", network, entry.holders);
            let dead = match &entry.state {
                EntryState::Live(api) if api.is_connected() => {
                    return Ok(Claim::Live(Rc::clone(api)));
                }
                EntryState::Connecting(attempt) => {
                    return Ok(Claim::Connecting(attempt.clone(), entry.generation));
                }
                EntryState::Live(api) => Rc::clone(api),
            };

            tracing::warn!("Connection to {} dropped, reconnecting to {}", network, entry.url);
            let (attempt, generation) = self.start_attempt(&entry.url);
            entry.state = EntryState::Connecting(attempt.clone());
            entry.generation = generation;
            entry.connected_at = None;
            *dropped = Some(dead);
            return Ok(Claim::Connecting(attempt, generation));
        }

        let url = self
            .endpoints
            .get(network)
            .ok_or_else(|| SessionError::UnknownNetwork(network.to_string()))?
            .clone();

        tracing::info!("Connecting to {} at {}", network, url);
        let (attempt, generation) = self.start_attempt(&url);
        entries.insert(
            network.clone(),
            ConnectionEntry {
                state: EntryState::Connecting(attempt.clone()),
                holders: 1,
                generation,
                lineage: generation,
                url,
                connected_at: None,
            },
        );

        Ok(Claim::Connecting(attempt, generation))
    }

    fn start_attempt(&self, url: &str) -> (ConnectAttempt, u64) {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let transport = Rc::clone(&self.transport);
        let target = url.to_string();
        let attempt = async move { transport.connect(&target).await }
            .boxed_local()
            .shared();
        (attempt, generation)
    }

    fn promote(
        &self,
        network: &NetworkId,
        generation: u64,
        api: Rc<dyn ChainApi>,
    ) -> Result<Promotion, SessionError> {
        let current = {
            let mut entries = self.entries.borrow_mut();
            match entries.get_mut(network) {
                Some(entry) if entry.generation == generation => {
                    if matches!(entry.state, EntryState::Connecting(_)) {
                        tracing::info!("Connected to {} at {}", network, entry.url);
                        entry.state = EntryState::Live(Rc::clone(&api));
                        entry.connected_at = Some(Utc::now());
                    }
                    Some(Promotion::Ready(ChainHandle::new(network.clone(), api.clone())))
                }
                // Our connection dropped and was replaced before we saw it.
                Some(entry) if entry.owns(generation) => Some(match &entry.state {
                    EntryState::Live(live) => {
                        Promotion::Ready(ChainHandle::new(network.clone(), Rc::clone(live)))
                    }
                    EntryState::Connecting(attempt) => {
                        Promotion::Rejoin(attempt.clone(), entry.generation)
                    }
                }),
                _ => None,
            }
        };

        if let Some(promotion) = current {
            return Ok(promotion);
        }

        tracing::warn!("Session for {} was closed while connecting", network);
        api.disconnect();
        Err(SessionError::ConnectionFailed(format!(
            "session for {} closed while connecting",
            network
        )))
    }

    fn abandon(&self, network: &NetworkId, generation: u64, error: &SessionError) {
        let mut entries = self.entries.borrow_mut();
        if entries
            .get(network)
            .is_some_and(|e| e.generation == generation)
        {
            tracing::warn!("Connection to {} failed: {}", network, error);
            entries.remove(network);
        }
    }

    fn release_claim(&self, network: &NetworkId, generation: Option<u64>) {
        let closed = {
            let Ok(mut entries) = self.entries.try_borrow_mut() else {
                tracing::error!("Session registry borrow failed releasing {}", network);
                return;
            };
            let Some(entry) = entries.get_mut(network) else {
                tracing::debug!("Release of {} with no open session", network);
                return;
            };
            if generation.is_some_and(|g| !entry.owns(g)) {
                return;
            }

            entry.holders = entry.holders.saturating_sub(1);
            if entry.holders > 0 {
                tracing::debug!("Released {} ({} holders left)", network, entry.holders);
                return;
            }
            entries.remove(network)
        };

        if let Some(entry) = closed {
            tracing::info!("Closing session for {}", network);
            entry.close();
        }
    }
}

/// Gives back a claim when an `acquire` future is dropped mid-connect.
struct ClaimGuard<'a> {
    registry: &'a SessionRegistry,
    network: &'a NetworkId,
    generation: u64,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        tracing::debug!("Acquire of {} cancelled", self.network);
        self.registry
            .release_claim(self.network, Some(self.generation));
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct SessionRegistryBuilder {
    endpoints: HashMap<NetworkId, String>,
}

impl SessionRegistryBuilder {
    /// Register the RPC endpoint of a network. Later calls for the same id
    /// replace the url.
    pub fn endpoint(mut self, network: impl Into<NetworkId>, url: &str) -> Self {
        self.endpoints.insert(network.into(), url.to_string());
        self
    }

    pub fn build(self, transport: Rc<dyn ChainTransport>) -> SessionRegistry {
        SessionRegistry {
            transport,
            endpoints: self.endpoints,
            entries: RefCell::new(HashMap::new()),
            generation: Cell::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Signer;
    use async_trait::async_trait;

    #[derive(Default)]
    struct StubApi {
        closed: Cell<usize>,
        dropped: Cell<bool>,
        signer: RefCell<Option<Rc<dyn Signer>>>,
    }

    impl ChainApi for StubApi {
        fn is_connected(&self) -> bool {
            !self.dropped.get() && self.closed.get() == 0
        }

        fn disconnect(&self) {
            self.closed.set(self.closed.get() + 1);
        }

        fn set_signer(&self, signer: Option<Rc<dyn Signer>>) {
            *self.signer.borrow_mut() = signer;
        }

        fn signer(&self) -> Option<Rc<dyn Signer>> {
            self.signer.borrow().clone()
        }
    }

    /// Connects instantly, remembering the last connection it made.
    #[derive(Default)]
    struct InstantTransport {
        connects: Cell<usize>,
        last: RefCell<Option<Rc<StubApi>>>,
    }

    #[async_trait(?Send)]
    impl ChainTransport for InstantTransport {
        async fn connect(&self, url: &str) -> Result<Rc<dyn ChainApi>, SessionError> {
            self.connects.set(self.connects.get() + 1);
            if url.contains("bad") {
                return Err(SessionError::ConnectionFailed("refused".to_string()));
            }
            let api = Rc::new(StubApi::default());
            *self.last.borrow_mut() = Some(Rc::clone(&api));
            Ok(api)
        }
    }

    fn registry(transport: &Rc<InstantTransport>) -> SessionRegistry {
        SessionRegistry::builder()
            .endpoint("warpx", "ws://127.0.0.1:9944")
            .endpoint("broken", "ws://bad")
            .build(transport.clone())
    }

    #[tokio::test]
    async fn test_acquire_then_release_closes() {
        let transport = Rc::new(InstantTransport::default());
        let registry = registry(&transport);
        let warpx = NetworkId::from("warpx");

        let handle = registry.acquire(&warpx).await.unwrap();
        assert_eq!(handle.network(), &warpx);
        assert!(registry.is_live(&warpx));
        assert_eq!(registry.holders(&warpx), 1);

        registry.release(&warpx);
        assert!(!registry.contains(&warpx));
        let api = transport.last.borrow().clone().unwrap();
        assert_eq!(api.closed.get(), 1);
    }

    #[tokio::test]
    async fn test_second_acquire_reuses_live_connection() {
        let transport = Rc::new(InstantTransport::default());
        let registry = registry(&transport);
        let warpx = NetworkId::from("warpx");

        let a = registry.acquire(&warpx).await.unwrap();
        let b = registry.acquire(&warpx).await.unwrap();
        assert!(a.ptr_eq(&b));
        assert_eq!(transport.connects.get(), 1);
        assert_eq!(registry.holders(&warpx), 2);

        registry.release(&warpx);
        assert!(registry.is_live(&warpx));
        registry.release(&warpx);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_connection_is_replaced() {
        let transport = Rc::new(InstantTransport::default());
        let registry = registry(&transport);
        let warpx = NetworkId::from("warpx");

        let a = registry.acquire(&warpx).await.unwrap();
        let first = transport.last.borrow().clone().unwrap();
        first.dropped.set(true);
        assert!(!registry.is_live(&warpx));

        let b = registry.acquire(&warpx).await.unwrap();
        assert!(!a.ptr_eq(&b));
        assert_eq!(transport.connects.get(), 2);
        assert_eq!(first.closed.get(), 1);
        assert!(registry.is_live(&warpx));
        assert_eq!(registry.holders(&warpx), 2);
    }

    #[tokio::test]
    async fn test_unknown_network_does_not_touch_transport() {
        let transport = Rc::new(InstantTransport::default());
        let registry = registry(&transport);

        let err = registry.acquire(&NetworkId::from("nope")).await.unwrap_err();
        assert_eq!(err, SessionError::UnknownNetwork("nope".to_string()));
        assert_eq!(transport.connects.get(), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_failed_connect_removes_entry() {
        let transport = Rc::new(InstantTransport::default());
        let registry = registry(&transport);
        let broken = NetworkId::from("broken");

        assert!(registry.acquire(&broken).await.is_err());
        assert!(!registry.contains(&broken));
        assert!(registry.acquire(&broken).await.is_err());
        assert_eq!(transport.connects.get(), 2);
    }

    #[tokio::test]
    async fn test_release_unknown_is_noop() {
        let transport = Rc::new(InstantTransport::default());
        let registry = registry(&transport);
        registry.release(&NetworkId::from("warpx"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_connection_info() {
        let transport = Rc::new(InstantTransport::default());
        let registry = registry(&transport);
        let warpx = NetworkId::from("warpx");

        assert!(registry.connection_info(&warpx).is_none());
        let _handle = registry.acquire(&warpx).await.unwrap();
        let info = registry.connection_info(&warpx).unwrap();
        assert_eq!(info.url, "ws://127.0.0.1:9944");
        assert_eq!(info.holders, 1);
        assert!(info.is_live());
    }

    #[tokio::test]
    async fn test_clear_disconnects_all() {
        let transport = Rc::new(InstantTransport::default());
        let registry = registry(&transport);
        let warpx = NetworkId::from("warpx");

        let _a = registry.acquire(&warpx).await.unwrap();
        let _b = registry.acquire(&warpx).await.unwrap();
        registry.clear();

        assert!(registry.is_empty());
        let api = transport.last.borrow().clone().unwrap();
        assert_eq!(api.closed.get(), 1);
    }

    #[test]
    fn test_from_config() {
        let transport: Rc<dyn ChainTransport> = Rc::new(InstantTransport::default());
        let registry = SessionRegistry::from_config(&SessionConfig::default(), transport);
        assert_eq!(
            registry.endpoint(&NetworkId::default()),
            Some("ws://127.0.0.1:9944")
        );
    }
}
