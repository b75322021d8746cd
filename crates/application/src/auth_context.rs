//! Shared bearer credential passed explicitly to the HTTP layer.

use std::sync::Arc;

use fundline_core::BearerToken;
use tokio::sync::watch;

/// Cloneable handle to the current bearer token.
///
/// The session store writes it on login and logout, the API client clears it
/// on 401, and every outgoing request reads it. Each context is independent,
/// so parallel sessions and tests never share a token.
#[derive(Clone)]
pub struct AuthContext {
    token: Arc<watch::Sender<Option<BearerToken>>>,
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            token: Arc::new(sender),
        }
    }

    /// Returns the current token.
    #[must_use]
    pub fn token(&self) -> Option<BearerToken> {
        self.token.borrow().clone()
    }

    /// Returns true when a token is set.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.borrow().is_some()
    }

    /// Installs a token for all future requests.
    pub fn set(&self, token: BearerToken) {
        self.token.send_replace(Some(token));
    }

    /// Removes the token. Returns true when one was set.
    pub fn clear(&self) -> bool {
        self.token.send_replace(None).is_some()
    }

    /// Subscribes to token changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<BearerToken>> {
        self.token.subscribe()
    }
}
