//! Native chain transport: `tokio-tungstenite`.
//!
//! Opens the RPC WebSocket and keeps it alive in a background tokio task
//! that answers pings until the connection is closed. Must run inside a
//! tokio runtime.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::SessionError;
use crate::session::{ChainApi, ChainTransport};
use crate::wallet::Signer;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct WsTransportConfig {
    /// Upper bound on the WebSocket handshake.
    pub connect_timeout: Duration,
}

impl Default for WsTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// [`ChainTransport`] over a native WebSocket.
#[derive(Debug, Clone, Default)]
pub struct WsTransport {
    config: WsTransportConfig,
}

impl WsTransport {
    pub fn new(config: WsTransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait(?Send)]
impl ChainTransport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Rc<dyn ChainApi>, SessionError> {
        let (ws_stream, _) = tokio::time::timeout(self.config.connect_timeout, connect_async(url))
            .await
            .map_err(|_| SessionError::Timeout)?
            .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;

        tracing::info!("Chain RPC connected: {}", url);
        let (sink, stream) = ws_stream.split();
        let (close_tx, close_rx) = oneshot::channel();
        let open = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(run_connection(sink, stream, close_rx, Arc::clone(&open)));

        Ok(Rc::new(WsChainApi {
            url: url.to_string(),
            open,
            close_tx: RefCell::new(Some(close_tx)),
            task: RefCell::new(Some(task)),
            signer: RefCell::new(None),
        }))
    }
}

// ─── WsChainApi ──────────────────────────────────────────────────────────────

/// A live RPC WebSocket.
pub struct WsChainApi {
    url: String,
    open: Arc<AtomicBool>,
    close_tx: RefCell<Option<oneshot::Sender<()>>>,
    task: RefCell<Option<JoinHandle<()>>>,
    signer: RefCell<Option<Rc<dyn Signer>>>,
}

impl WsChainApi {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChainApi for WsChainApi {
    fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn disconnect(&self) {
        let close_tx = self.close_tx.try_borrow_mut().ok().and_then(|mut tx| tx.take());
        if let Some(tx) = close_tx {
            tracing::info!("Closing chain RPC connection: {}", self.url);
            let _ = tx.send(());
        }
        if let Ok(mut signer) = self.signer.try_borrow_mut() {
            *signer = None;
        }
    }

    fn set_signer(&self, signer: Option<Rc<dyn Signer>>) {
        match self.signer.try_borrow_mut() {
            Ok(mut slot) => *slot = signer,
            Err(e) => tracing::error!("Signer borrow failed: {}", e),
        }
    }

    fn signer(&self) -> Option<Rc<dyn Signer>> {
        self.signer.try_borrow().ok().and_then(|s| s.clone())
    }
}

impl Drop for WsChainApi {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_connection(
    mut sink: SplitSink<WsStream, Message>,
    mut stream: SplitStream<WsStream>,
    mut close_rx: oneshot::Receiver<()>,
    open: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = extract_close(frame.as_ref());
                        tracing::warn!("Chain RPC closed by peer ({}): {}", code, reason);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("Chain RPC error: {}", e);
                        break;
                    }
                    None => {
                        tracing::warn!("Chain RPC stream ended");
                        break;
                    }
                }
            }
            _ = &mut close_rx => {
                let _ = sink.send(Message::Close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: "Client disconnect".into(),
                }))).await;
                break;
            }
        }
    }
    open.store(false, Ordering::SeqCst);
}

fn extract_close(frame: Option<&CloseFrame>) -> (u16, String) {
    match frame {
        Some(f) => (f.code.into(), f.reason.to_string()),
        None => (1006, "No close frame".into()),
    }
}
