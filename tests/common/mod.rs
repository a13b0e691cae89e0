//! In-memory doubles for the chain transport and the wallet extension.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;

use warpx_sdk::error::SessionError;
use warpx_sdk::session::{ChainApi, ChainTransport, SessionRegistry};
use warpx_sdk::shared::AccountAddress;
use warpx_sdk::wallet::{InjectedAccount, InjectedExtension, Signer, WalletExtensions};

pub const WARPX_URL: &str = "ws://127.0.0.1:9944";

// ─── Chain ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockApi {
    pub url: String,
    disconnects: Cell<usize>,
    dropped: Cell<bool>,
    signer: RefCell<Option<Rc<dyn Signer>>>,
}

impl MockApi {
    pub fn disconnects(&self) -> usize {
        self.disconnects.get()
    }

    /// Simulate the node closing the connection.
    pub fn drop_connection(&self) {
        self.dropped.set(true);
    }
}

impl ChainApi for MockApi {
    fn is_connected(&self) -> bool {
        !self.dropped.get() && self.disconnects.get() == 0
    }

    fn disconnect(&self) {
        self.disconnects.set(self.disconnects.get() + 1);
    }

    fn set_signer(&self, signer: Option<Rc<dyn Signer>>) {
        *self.signer.borrow_mut() = signer;
    }

    fn signer(&self) -> Option<Rc<dyn Signer>> {
        self.signer.borrow().clone()
    }
}

type Handshake = oneshot::Sender<Result<(), SessionError>>;

/// Transport whose handshakes either complete at once or wait for the test
/// to call [`MockTransport::complete`].
pub struct MockTransport {
    gated: bool,
    connects: Cell<usize>,
    handshakes: RefCell<VecDeque<Handshake>>,
    apis: RefCell<Vec<Rc<MockApi>>>,
}

impl MockTransport {
    pub fn instant() -> Rc<Self> {
        Rc::new(Self::new(false))
    }

    pub fn gated() -> Rc<Self> {
        Rc::new(Self::new(true))
    }

    fn new(gated: bool) -> Self {
        Self {
            gated,
            connects: Cell::new(0),
            handshakes: RefCell::new(VecDeque::new()),
            apis: RefCell::new(Vec::new()),
        }
    }

    /// Number of `connect` calls that started.
    pub fn connects(&self) -> usize {
        self.connects.get()
    }

    /// Resolve the oldest pending handshake. Returns `false` if nobody was
    /// waiting on it any more.
    pub fn complete(&self, result: Result<(), SessionError>) -> bool {
        let handshake = self
            .handshakes
            .borrow_mut()
            .pop_front()
            .expect("no pending handshake");
        handshake.send(result).is_ok()
    }

    /// Every connection handed out so far.
    pub fn apis(&self) -> Vec<Rc<MockApi>> {
        self.apis.borrow().clone()
    }

    pub fn last_api(&self) -> Rc<MockApi> {
        self.apis.borrow().last().cloned().expect("no connection made")
    }
}

#[async_trait(?Send)]
impl ChainTransport for MockTransport {
    async fn connect(&self, url: &str) -> Result<Rc<dyn ChainApi>, SessionError> {
        self.connects.set(self.connects.get() + 1);

        if self.gated {
            let (tx, rx) = oneshot::channel();
            self.handshakes.borrow_mut().push_back(tx);
            match rx.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(SessionError::ConnectionFailed("handshake dropped".into())),
            }
        }

        let api = Rc::new(MockApi {
            url: url.to_string(),
            ..MockApi::default()
        });
        self.apis.borrow_mut().push(Rc::clone(&api));
        Ok(api)
    }
}

pub fn registry(transport: &Rc<MockTransport>) -> Rc<SessionRegistry> {
    Rc::new(
        SessionRegistry::builder()
            .endpoint("warpx", WARPX_URL)
            .build(transport.clone()),
    )
}

// ─── Wallet extension ────────────────────────────────────────────────────────

pub struct MockSigner {
    pub name: String,
}

impl MockSigner {
    pub fn new(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
        })
    }
}

#[async_trait(?Send)]
impl Signer for MockSigner {
    async fn sign_raw(&self, address: &AccountAddress, data: &[u8]) -> Result<Vec<u8>, String> {
        let mut signed = format!("{}:{}:", self.name, address).into_bytes();
        signed.extend_from_slice(data);
        Ok(signed)
    }
}

#[derive(Default)]
pub struct MockExtensions {
    extensions: Vec<InjectedExtension>,
    accounts: Vec<InjectedAccount>,
    enable_error: RefCell<Option<String>>,
    accounts_error: RefCell<Option<String>>,
    enabled_for: RefCell<Vec<String>>,
}

impl MockExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extension(mut self, name: &str, signer: Rc<MockSigner>) -> Self {
        self.extensions.push(InjectedExtension {
            name: name.to_string(),
            version: "0.46.1".to_string(),
            signer,
        });
        self
    }

    pub fn with_account(mut self, address: &str, source: &str) -> Self {
        self.accounts.push(InjectedAccount {
            address: AccountAddress::new(address),
            name: None,
            source: source.to_string(),
        });
        self
    }

    pub fn set_enable_error(&self, error: Option<&str>) {
        *self.enable_error.borrow_mut() = error.map(str::to_string);
    }

    pub fn set_accounts_error(&self, error: Option<&str>) {
        *self.accounts_error.borrow_mut() = error.map(str::to_string);
    }

    /// App names passed to `enable`, in call order.
    pub fn enabled_for(&self) -> Vec<String> {
        self.enabled_for.borrow().clone()
    }
}

#[async_trait(?Send)]
impl WalletExtensions for MockExtensions {
    async fn enable(&self, app_name: &str) -> Result<Vec<InjectedExtension>, String> {
        self.enabled_for.borrow_mut().push(app_name.to_string());
        match self.enable_error.borrow().clone() {
            Some(e) => Err(e),
            None => Ok(self.extensions.clone()),
        }
    }

    async fn list_accounts(&self) -> Result<Vec<InjectedAccount>, String> {
        match self.accounts_error.borrow().clone() {
            Some(e) => Err(e),
            None => Ok(self.accounts.clone()),
        }
    }
}

/// Whether `bound` is exactly the mock signer `expected`.
pub fn same_signer(bound: &Rc<dyn Signer>, expected: &Rc<MockSigner>) -> bool {
    std::ptr::eq(
        Rc::as_ptr(bound) as *const (),
        Rc::as_ptr(expected) as *const (),
    )
}
