//! Durable session storage.

use std::sync::Arc;

use log::warn;

use platewise_core::{KvStore, Session};

use crate::errors::Result;

const SESSION_KEY: &str = "platewise.session";

/// Owns the single active [`Session`] for this profile. Created by the
/// authentication flow on login/registration, overwritten on re-login,
/// cleared on logout. Other components only read it.
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Persist `session`, replacing whatever was stored before.
    pub fn store(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string(session)?;
        self.kv.set(SESSION_KEY, &raw)?;
        Ok(())
    }

    /// The stored session, if any. An unreadable stored value is treated
    /// as logged-out rather than bricking the app.
    pub fn load(&self) -> Result<Option<Session>> {
        let Some(raw) = self.kv.get(SESSION_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("stored session is unreadable, treating as logged out: {}", e);
                Ok(None)
            }
        }
    }

    /// The bearer token, when a non-empty one is stored.
    pub fn token(&self) -> Result<Option<String>> {
        Ok(self
            .load()?
            .filter(Session::has_token)
            .and_then(|s| s.token))
    }

    /// Drop the bearer token but keep the profile snapshot. Requests
    /// issued afterwards go out unauthenticated.
    pub fn clear_token(&self) -> Result<()> {
        if let Some(mut session) = self.load()? {
            session.token = None;
            self.store(&session)?;
        }
        Ok(())
    }

    /// Remove the session entirely (logout).
    pub fn clear(&self) -> Result<()> {
        self.kv.remove(SESSION_KEY)?;
        Ok(())
    }
}
