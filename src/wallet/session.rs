//! `WalletSession`: connects a page to a chain network through a browser
//! wallet extension.
//!
//! Setup runs strictly in sequence:
//!
//! ```text
//! acquire connection → enable extension → list accounts → bind signer → Ready
//! ```
//!
//! The whole sequence runs under an `Abortable`. `disconnect()` (or dropping
//! the session) aborts it, so a connection or signer that arrives after
//! teardown is never written into the session.

use std::cell::RefCell;
use std::rc::Rc;

use futures_util::future::{AbortHandle, Abortable};

use crate::error::WalletError;
use crate::session::{ChainHandle, SessionRegistry};
use crate::shared::{AccountAddress, NetworkId};
use crate::wallet::{
    InjectedAccount, InjectedExtension, SessionPhase, Signer, WalletExtensions, WalletSnapshot,
};

#[derive(Default)]
struct SessionState {
    phase: SessionPhase,
    /// Connection borrowed from the registry; `Some` means we hold a claim.
    lease: Option<ChainHandle>,
    extensions: Vec<InjectedExtension>,
    accounts: Vec<InjectedAccount>,
    selected: Option<AccountAddress>,
    signer: Option<Rc<dyn Signer>>,
    setup: Option<AbortHandle>,
    attempt: u64,
}

/// Wallet session for one network.
///
/// Methods take `&self`; keep the session in an `Rc` when `disconnect()`
/// must be reachable while `connect()` is pending.
pub struct WalletSession {
    network: NetworkId,
    app_name: String,
    registry: Rc<SessionRegistry>,
    extensions: Rc<dyn WalletExtensions>,
    on_phase_change: Option<Box<dyn Fn(&SessionPhase)>>,
    state: RefCell<SessionState>,
}

impl WalletSession {
    pub fn builder(network: impl Into<NetworkId>) -> WalletSessionBuilder {
        WalletSessionBuilder {
            network: network.into(),
            app_name: crate::network::DEFAULT_APP_NAME.to_string(),
            on_phase_change: None,
        }
    }

    /// Run the setup sequence.
    ///
    /// Starts from `Idle` or `Failed`. A call while `Connecting` or `Ready`
    /// returns `Ok(())` at once without waiting: `Ok` from such a call does
    /// not mean the session is ready, so check [`phase`](Self::phase) or
    /// listen with `on_phase_change`. Only the call that started the setup
    /// resolves with its outcome.
    ///
    /// Failures are also recorded as `SessionPhase::Failed`. Returns
    /// `WalletError::Cancelled` if the session was torn down before setup
    /// finished; the session is not touched in that case.
    pub async fn connect(&self) -> Result<(), WalletError> {
        let (registration, attempt) = {
            let mut state = self.state.borrow_mut();
            if matches!(state.phase, SessionPhase::Connecting | SessionPhase::Ready) {
                return Ok(());
            }
            let (handle, registration) = AbortHandle::new_pair();
            state.setup = Some(handle);
            state.attempt += 1;
            (registration, state.attempt)
        };
        self.set_phase(SessionPhase::Connecting);
        tracing::info!("Connecting wallet session for {}", self.network);

        match Abortable::new(self.setup(), registration).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.fail(attempt, e.clone());
                Err(e)
            }
            Err(_aborted) => {
                tracing::debug!("Wallet session setup for {} aborted", self.network);
                Err(WalletError::Cancelled)
            }
        }
    }

    /// Tear down: abort any pending setup, unbind our signer, give the
    /// connection back to the registry and return to `Idle`.
    ///
    /// Other holders of the same network keep their connection.
    pub fn disconnect(&self) {
        let (setup, lease, signer, was_idle) = {
            let mut state = self.state.borrow_mut();
            let was_idle = state.phase == SessionPhase::Idle && state.lease.is_none();
            state.extensions.clear();
            state.accounts.clear();
            state.selected = None;
            (
                state.setup.take(),
                state.lease.take(),
                state.signer.take(),
                was_idle,
            )
        };

        if let Some(setup) = setup {
            setup.abort();
        }

        if let Some(handle) = lease {
            if let (Some(ours), Some(bound)) = (signer, handle.signer()) {
                if Rc::ptr_eq(&ours, &bound) {
                    handle.set_signer(None);
                }
            }
            self.registry.release(handle.network());
        }

        if !was_idle {
            tracing::info!("Wallet session for {} disconnected", self.network);
            self.set_phase(SessionPhase::Idle);
        }
    }

    /// Switch the active account and rebind its extension's signer.
    pub fn set_selected_account(&self, address: &AccountAddress) -> Result<(), WalletError> {
        let (lease, signer) = {
            let mut state = self.state.borrow_mut();
            if !state.phase.is_ready() {
                return Err(WalletError::NotReady);
            }
            let account = state
                .accounts
                .iter()
                .find(|a| &a.address == address)
                .ok_or_else(|| WalletError::UnknownAccount(address.to_string()))?;
            let signer = signer_for(&state.extensions, &account.source);
            state.selected = Some(address.clone());
            state.signer = signer.clone();
            (state.lease.clone(), signer)
        };

        if let Some(handle) = lease {
            handle.set_signer(signer);
        }
        tracing::debug!("Selected account {}", address.short());
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn network(&self) -> &NetworkId {
        &self.network
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase.clone()
    }

    pub fn accounts(&self) -> Vec<InjectedAccount> {
        self.state.borrow().accounts.clone()
    }

    pub fn selected_account(&self) -> Option<AccountAddress> {
        self.state.borrow().selected.clone()
    }

    /// The last failure, if the session is `Failed`.
    pub fn error(&self) -> Option<WalletError> {
        self.state.borrow().phase.error().cloned()
    }

    /// The shared connection, once acquired.
    pub fn handle(&self) -> Option<ChainHandle> {
        self.state.borrow().lease.clone()
    }

    /// The signer bound for the selected account.
    pub fn signer(&self) -> Option<Rc<dyn Signer>> {
        self.state.borrow().signer.clone()
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        let state = self.state.borrow();
        WalletSnapshot {
            network: self.network.clone(),
            phase: state.phase.clone(),
            accounts: state.accounts.clone(),
            selected_account: state.selected.clone(),
        }
    }

    // ── internals ────────────────────────────────────────────────────────

    async fn setup(&self) -> Result<(), WalletError> {
        let handle = self.registry.acquire(&self.network).await?;
        self.state.borrow_mut().lease = Some(handle.clone());

        let enabled = self
            .extensions
            .enable(&self.app_name)
            .await
            .map_err(WalletError::ExtensionUnavailable)?;
        if enabled.is_empty() {
            return Err(WalletError::ExtensionUnavailable(
                "no wallet extension authorized the app".to_string(),
            ));
        }

        let accounts = self
            .extensions
            .list_accounts()
            .await
            .map_err(WalletError::ExtensionUnavailable)?;

        let selected = accounts.first().map(|a| a.address.clone());
        let signer = accounts
            .first()
            .and_then(|a| signer_for(&enabled, &a.source));
        if signer.is_some() {
            handle.set_signer(signer.clone());
        }

        match &selected {
            Some(address) => tracing::info!(
                "Wallet session for {} ready ({} accounts, selected {})",
                self.network,
                accounts.len(),
                address.short()
            ),
            None => tracing::info!("Wallet session for {} ready with no accounts", self.network),
        }

        {
            let mut state = self.state.borrow_mut();
            state.extensions = enabled;
            state.accounts = accounts;
            state.selected = selected;
            state.signer = signer;
            state.setup = None;
        }
        self.set_phase(SessionPhase::Ready);
        Ok(())
    }

    fn fail(&self, attempt: u64, error: WalletError) {
        let lease = {
            let mut state = self.state.borrow_mut();
            if state.attempt != attempt {
                return;
            }
            state.setup = None;
            state.lease.take()
        };
        if let Some(handle) = lease {
            self.registry.release(handle.network());
        }

        tracing::warn!("Wallet session for {} failed: {}", self.network, error);
        self.set_phase(SessionPhase::Failed(error));
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.state.borrow_mut().phase = phase.clone();
        if let Some(listener) = &self.on_phase_change {
            listener(&phase);
        }
    }
}

impl Drop for WalletSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Signer of the extension named `source`, else of the first extension.
fn signer_for(extensions: &[InjectedExtension], source: &str) -> Option<Rc<dyn Signer>> {
    extensions
        .iter()
        .find(|e| e.name == source)
        .or_else(|| extensions.first())
        .map(|e| Rc::clone(&e.signer))
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct WalletSessionBuilder {
    network: NetworkId,
    app_name: String,
    on_phase_change: Option<Box<dyn Fn(&SessionPhase)>>,
}

impl WalletSessionBuilder {
    /// Name announced to the extension on `enable`.
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = name.to_string();
        self
    }

    /// Called after every phase transition.
    pub fn on_phase_change(mut self, listener: impl Fn(&SessionPhase) + 'static) -> Self {
        self.on_phase_change = Some(Box::new(listener));
        self
    }

    pub fn build(
        self,
        registry: Rc<SessionRegistry>,
        extensions: Rc<dyn WalletExtensions>,
    ) -> WalletSession {
        WalletSession {
            network: self.network,
            app_name: self.app_name,
            registry,
            extensions,
            on_phase_change: self.on_phase_change,
            state: RefCell::new(SessionState::default()),
        }
    }
}
