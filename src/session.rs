//! Session holder: owns the token bundle, persists it in client storage and
//! notifies subscribers whenever it changes.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::db::{self, Pool};
use crate::model::SessionToken;

/// Storage key holding the JSON token bundle.
pub const SESSION_KEY: &str = "token";

/// Raw string storage behind the session holder.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
    /// Returns whether the key existed.
    async fn remove_item(&self, key: &str) -> Result<bool>;
}

#[async_trait]
impl SessionStorage for Pool {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        db::get_item(self, key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        db::set_item(self, key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<bool> {
        db::remove_item(self, key).await
    }
}

/// Process-local storage; nothing survives a restart.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<bool> {
        Ok(self.items.lock().await.remove(key).is_some())
    }
}

#[derive(Clone)]
pub struct SessionHolder {
    store: Arc<dyn SessionStorage>,
    tx: Arc<watch::Sender<Option<SessionToken>>>,
}

impl std::fmt::Debug for SessionHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHolder")
            .field("signed_in", &self.tx.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl SessionHolder {
    /// Read storage once and start publishing the current session.
    pub async fn open(store: impl SessionStorage + 'static) -> Result<Self> {
        let (tx, _rx) = watch::channel(None);
        let holder = Self {
            store: Arc::new(store),
            tx: Arc::new(tx),
        };
        holder.load().await?;
        Ok(holder)
    }

    /// Parse the stored bundle. Malformed data, or a bundle without a token,
    /// is removed and reported as signed out.
    pub async fn load(&self) -> Result<Option<SessionToken>> {
        let raw = self.store.get_item(SESSION_KEY).await?;
        let session = match raw {
            None => None,
            Some(raw) => match parse_bundle(&raw) {
                Some(session) => Some(session),
                None => {
                    warn!("stored session is malformed; clearing it");
                    self.store.remove_item(SESSION_KEY).await?;
                    None
                }
            },
        };
        self.publish(session.clone());
        Ok(session)
    }

    pub async fn save(&self, session: SessionToken) -> Result<()> {
        let raw = serde_json::to_string(&session)?;
        self.store.set_item(SESSION_KEY, &raw).await?;
        info!(username = %session.username, "session saved");
        self.publish(Some(session));
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        if self.store.remove_item(SESSION_KEY).await? {
            info!("session cleared");
        }
        self.publish(None);
        Ok(())
    }

    /// In-memory snapshot; does not touch storage.
    pub fn current(&self) -> Option<SessionToken> {
        self.tx.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionToken>> {
        self.tx.subscribe()
    }

    fn publish(&self, session: Option<SessionToken>) {
        self.tx.send_if_modified(|current| {
            if *current == session {
                return false;
            }
            debug!(signed_in = session.is_some(), "session changed");
            *current = session;
            true
        });
    }
}

fn parse_bundle(raw: &str) -> Option<SessionToken> {
    let session: SessionToken = serde_json::from_str(raw).ok()?;
    if session.token.trim().is_empty() {
        return None;
    }
    Some(session)
}
