//! Network constants for the WarpX SDK.

/// Network id the front-end connects to when none is configured.
pub const DEFAULT_NETWORK_ID: &str = "warpx";

/// Application name announced to the wallet extension on `enable`.
pub const DEFAULT_APP_NAME: &str = "warpx";

/// Default chain RPC endpoint (a local development node).
pub const DEFAULT_RPC_URL: &str = "ws://127.0.0.1:9944";
