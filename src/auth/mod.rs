//! Bearer credentials for the shop service.
//!
//! Acquiring and refreshing tokens is handled elsewhere; the repositories only
//! ask a [`TokenProvider`] for the current token on every request.

use std::fmt;
use std::sync::{Arc, RwLock};

pub trait TokenProvider: Send + Sync {
    /// The token to send, or `None` for anonymous requests.
    fn bearer_token(&self) -> Option<String>;
}

/// A token fixed for the lifetime of the process, e.g. read from the
/// environment by the CLI.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone()).filter(|t| !t.is_empty())
    }
}

/// A token slot the session layer can replace after a refresh. Clones share
/// the same slot.
#[derive(Clone, Default)]
pub struct SharedToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl SharedToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        let mut slot = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(token.into());
    }

    pub fn clear(&self) {
        let mut slot = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = None;
    }
}

impl fmt::Debug for SharedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedToken")
            .field("present", &self.bearer_token().is_some())
            .finish()
    }
}

impl TokenProvider for SharedToken {
    fn bearer_token(&self) -> Option<String> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
