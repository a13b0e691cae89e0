//! Browser wallet extension capability and the wallet session state machine.

pub mod session;

pub use session::{WalletSession, WalletSessionBuilder};

use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;
use crate::shared::{AccountAddress, NetworkId};

// ─── Capability traits ───────────────────────────────────────────────────────

/// Signs payloads on behalf of an account. Provided by the wallet extension.
#[async_trait(?Send)]
pub trait Signer {
    async fn sign_raw(&self, address: &AccountAddress, data: &[u8]) -> Result<Vec<u8>, String>;
}

/// The injected wallet extensions of the host (e.g. the browser's
/// `injectedWeb3`).
///
/// Errors are the extension's own messages.
#[async_trait(?Send)]
pub trait WalletExtensions {
    /// Ask every installed extension to authorize `app_name`. An empty list
    /// means no extension is installed or the user denied access.
    async fn enable(&self, app_name: &str) -> Result<Vec<InjectedExtension>, String>;

    /// Accounts exposed by the enabled extensions.
    async fn list_accounts(&self) -> Result<Vec<InjectedAccount>, String>;
}

/// An extension that authorized the app.
#[derive(Clone)]
pub struct InjectedExtension {
    pub name: String,
    pub version: String,
    pub signer: Rc<dyn Signer>,
}

impl fmt::Debug for InjectedExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectedExtension")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// An account exposed by an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedAccount {
    pub address: AccountAddress,
    pub name: Option<String>,
    /// Name of the extension that injected the account.
    pub source: String,
}

// ─── SessionPhase ────────────────────────────────────────────────────────────

/// Lifecycle phase of a [`WalletSession`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Connecting,
    Ready,
    Failed(WalletError),
}

impl SessionPhase {
    pub fn as_str(&self) -> &str {
        match self {
            SessionPhase::Idle => "Idle",
            SessionPhase::Connecting => "Connecting",
            SessionPhase::Ready => "Ready",
            SessionPhase::Failed(_) => "Failed",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionPhase::Ready)
    }

    pub fn error(&self) -> Option<&WalletError> {
        match self {
            SessionPhase::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionPhase::Failed(e) => write!(f, "Failed: {}", e),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

// ─── WalletSnapshot ──────────────────────────────────────────────────────────

/// Observable state of a wallet session, for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSnapshot {
    pub network: NetworkId,
    pub phase: SessionPhase,
    pub accounts: Vec<InjectedAccount>,
    pub selected_account: Option<AccountAddress>,
}

impl WalletSnapshot {
    pub fn error(&self) -> Option<&WalletError> {
        self.phase.error()
    }
}
