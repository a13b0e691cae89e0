//! # WarpX SDK
//!
//! Chain session management and trade-input precision for the WarpX exchange
//! front-end. Runs in the browser (WASM) or natively on a single-threaded
//! executor.
//!
//! ## Architecture
//!
//! The SDK is organized in layers:
//!
//! 1. **Core**: Chain amounts, step snapping, input fields, market precision (pure, WASM-safe)
//! 2. **Session**: `SessionRegistry` sharing one chain connection per network
//! 3. **Wallet**: `WalletSession` driving the wallet extension against a shared connection
//! 4. **Transport**: `tokio-tungstenite` chain transport behind the `ws-native` feature
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use warpx_sdk::prelude::*;
//!
//! let config = SessionConfig::from_json(include_str!("config.json"))?;
//! let registry = Rc::new(SessionRegistry::from_config(&config, transport));
//!
//! let session = WalletSession::builder("warpx")
//!     .app_name(&config.app_name)
//!     .on_phase_change(|phase| tracing::info!("wallet: {}", phase))
//!     .build(registry.clone(), extensions);
//! session.connect().await?;
//!
//! let mut draft = OrderDraft::new(config.market("WARP-USDT").unwrap().clone());
//! draft.price.on_change("12.999");
//! draft.price.on_commit(); // "13.00"
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes, the amount codec and step snapping.
pub mod shared;

/// Decimal input field state machine.
pub mod input;

/// Domain modules: market precision and order drafts.
pub mod domain;

/// Front-end configuration.
pub mod config;

/// Unified SDK error types.
pub mod error;

/// Network constants.
pub mod network;

// ── Layer 2: Session ─────────────────────────────────────────────────────────

/// Chain connection capability traits and the session registry.
pub mod session;

// ── Layer 3: Wallet ──────────────────────────────────────────────────────────

/// Wallet extension capability traits and `WalletSession`.
pub mod wallet;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes + amount codec
    pub use crate::shared::{
        from_chain_amount, to_chain_amount, to_chain_price, try_to_chain_amount, AccountAddress,
        ChainAmount, NetworkId, Side,
    };

    // Input + domain
    pub use crate::domain::market::MarketPrecision;
    pub use crate::domain::order::{OrderDraft, ScaledOrder};
    pub use crate::input::{DecimalInput, InputState};

    // Config
    pub use crate::config::{NetworkEndpoint, SessionConfig};

    // Errors
    pub use crate::error::{
        AmountError, ConfigError, OrderError, SdkError, SessionError, WalletError,
        WalletErrorKind,
    };

    // Network
    pub use crate::network::{DEFAULT_APP_NAME, DEFAULT_NETWORK_ID, DEFAULT_RPC_URL};

    // Session
    pub use crate::session::{
        ChainApi, ChainHandle, ChainTransport, ConnectionInfo, SessionRegistry,
        SessionRegistryBuilder,
    };
    #[cfg(feature = "ws-native")]
    pub use crate::session::native::{WsTransport, WsTransportConfig};

    // Wallet
    pub use crate::wallet::{
        InjectedAccount, InjectedExtension, SessionPhase, Signer, WalletExtensions,
        WalletSession, WalletSessionBuilder, WalletSnapshot,
    };
}
