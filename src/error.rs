//! Unified SDK error types.

use thiserror::Error;

/// Top-level SDK error.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Chain connection errors.
///
/// `Clone` because every waiter joined on one in-flight connection attempt
/// observes the same failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    Timeout,
}

/// Wallet session errors, surfaced through `SessionPhase::Failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Connection failure: {0}")]
    ConnectionFailure(#[from] SessionError),

    #[error("Wallet extension not found or access denied: {0}")]
    ExtensionUnavailable(String),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Wallet session is not ready")]
    NotReady,

    #[error("Wallet session was disconnected")]
    Cancelled,
}

/// Coarse classification of a [`WalletError`], for UIs that render one
/// failure state per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletErrorKind {
    ConnectionFailure,
    ExtensionUnavailable,
    InvalidAccount,
    Cancelled,
}

impl WalletError {
    pub fn kind(&self) -> WalletErrorKind {
        match self {
            Self::ConnectionFailure(_) => WalletErrorKind::ConnectionFailure,
            Self::ExtensionUnavailable(_) => WalletErrorKind::ExtensionUnavailable,
            Self::UnknownAccount(_) | Self::NotReady => WalletErrorKind::InvalidAccount,
            Self::Cancelled => WalletErrorKind::Cancelled,
        }
    }
}

/// Strict amount validation errors.
///
/// The lenient codec never produces these; only `try_to_chain_amount` does.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Invalid amount '{input}': {reason}")]
    InvalidAmountInput { input: String, reason: String },
}

/// Errors while turning an order draft into chain amounts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("{field} has not been committed")]
    Uncommitted { field: &'static str },

    #[error("Computed {field} amount is zero")]
    ZeroAmount { field: &'static str },

    #[error("Overflow: {context}")]
    Overflow { context: String },
}

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Duplicate network id: {0}")]
    DuplicateNetwork(String),

    #[error("Step {step} must be positive")]
    NonPositiveStep { step: String },

    #[error("Step {step} cannot be expressed with {decimals} decimals")]
    StepPrecision { step: String, decimals: u8 },
}
