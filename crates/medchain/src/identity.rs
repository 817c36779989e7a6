//! The connected signing identity.
//!
//! Account switches and disconnects update a single watch channel. The
//! registry reads the current value on every write; nothing else reacts to
//! a change, so subscribers can only learn that the cached identity is stale.

use std::sync::Arc;

use medchain_core::{Keypair, Registrant};
use tokio::sync::watch;
use tracing::info;

/// Shared handle to the currently connected identity. Cheap to clone.
#[derive(Clone)]
pub struct IdentityWatch {
    tx: Arc<watch::Sender<Option<Keypair>>>,
}

impl IdentityWatch {
    /// A handle with no identity connected.
    pub fn disconnected() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// A handle with `keypair` already connected.
    pub fn connected(keypair: Keypair) -> Self {
        let watch = Self::disconnected();
        watch.connect(keypair);
        watch
    }

    /// Connect an identity, replacing any current one.
    pub fn connect(&self, keypair: Keypair) {
        info!(registrant = %keypair.registrant(), "identity connected");
        self.tx.send_replace(Some(keypair));
    }

    /// Switch accounts. Returns the registrant that was connected before.
    pub fn switch(&self, keypair: Keypair) -> Option<Registrant> {
        let registrant = keypair.registrant();
        let previous = self.tx.send_replace(Some(keypair));
        let previous = previous.as_ref().map(Keypair::registrant);
        info!(
            from = ?previous,
            to = %registrant,
            "identity switched"
        );
        previous
    }

    pub fn disconnect(&self) {
        if self.tx.send_replace(None).is_some() {
            info!("identity disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// The keypair to sign with right now.
    pub fn current(&self) -> Option<Keypair> {
        self.tx.borrow().clone()
    }

    pub fn registrant(&self) -> Option<Registrant> {
        self.tx.borrow().as_ref().map(Keypair::registrant)
    }

    /// Subscribe to identity changes.
    pub fn subscribe(&self) -> IdentitySubscription {
        IdentitySubscription {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for IdentityWatch {
    fn default() -> Self {
        Self::disconnected()
    }
}

impl std::fmt::Debug for IdentityWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityWatch")
            .field("registrant", &self.registrant())
            .finish()
    }
}

/// Receiving side of [`IdentityWatch`]. Only exposes public identities.
pub struct IdentitySubscription {
    rx: watch::Receiver<Option<Keypair>>,
}

impl IdentitySubscription {
    /// Wait until the identity changes. Returns the new registrant, or `None`
    /// if it was disconnected. Returns `None` as well once every
    /// [`IdentityWatch`] handle has been dropped.
    pub async fn changed(&mut self) -> Option<Registrant> {
        self.rx.changed().await.ok()?;
        self.current()
    }

    pub fn current(&self) -> Option<Registrant> {
        self.rx.borrow().as_ref().map(Keypair::registrant)
    }
}
