//! Server-side session store keyed by a signed session-id cookie.
//!
//! Session state (authenticated user, CSRF token, flash messages) lives in
//! the store, never in the cookie; the cookie only carries a random id plus
//! an HMAC-SHA256 signature over it. Handlers receive the session through a
//! request-scoped [`Session`] extractor rather than any ambient global.

use axum::{extract::FromRequestParts, http::request::Parts};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use uuid::Uuid;

use crate::{entities::user::UserRole, errors::ServiceError, AppState};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "storefront_session";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct SessionData {
    pub user_id: Option<Uuid>,
    pub role: Option<UserRole>,
    pub csrf_token: String,
    pub flash: Vec<FlashMessage>,
    pub expires_at: DateTime<Utc>,
}

/// In-memory session store. Adequate for the single-process model this
/// service targets; the interface would be unchanged over a shared backend.
pub struct SessionStore {
    secret: Vec<u8>,
    ttl: Duration,
    inner: DashMap<String, SessionData>,
}

impl SessionStore {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl: Duration::seconds(ttl_secs as i64),
            inner: DashMap::new(),
        }
    }

    fn sign(&self, session_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(session_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn verify_signature(&self, session_id: &str, signature: &str) -> bool {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(session_id.as_bytes());
        match hex::decode(signature) {
            Ok(sig) => mac.verify_slice(&sig).is_ok(),
            Err(_) => false,
        }
    }

    fn random_token(bytes: usize) -> String {
        let mut buf = vec![0u8; bytes];
        rand::thread_rng().fill_bytes(&mut buf);
        URL_SAFE_NO_PAD.encode(buf)
    }

    /// Drop every session past its expiry. Abandoned sessions never present
    /// their cookie again, so `resolve` alone would leak them.
    fn sweep_expired(&self) {
        let now = Utc::now();
        self.inner.retain(|_, data| data.expires_at >= now);
    }

    /// Create an anonymous session and return (session id, signed cookie value).
    pub fn create(&self) -> (String, String) {
        self.sweep_expired();
        let session_id = Self::random_token(32);
        let data = SessionData {
            user_id: None,
            role: None,
            csrf_token: Self::random_token(32),
            flash: Vec::new(),
            expires_at: Utc::now() + self.ttl,
        };
        self.inner.insert(session_id.clone(), data);
        let cookie = format!("{session_id}.{}", self.sign(&session_id));
        (session_id, cookie)
    }

    /// Resolve a cookie value to a live session id. Tampered signatures and
    /// expired sessions both come back as `None`.
    pub fn resolve(&self, cookie_value: &str) -> Option<String> {
        let (session_id, signature) = cookie_value.split_once('.')?;
        if !self.verify_signature(session_id, signature) {
            return None;
        }
        let expired = match self.inner.get(session_id) {
            Some(entry) => entry.expires_at < Utc::now(),
            None => return None,
        };
        if expired {
            self.inner.remove(session_id);
            return None;
        }
        Some(session_id.to_string())
    }

    pub fn get(&self, session_id: &str) -> Option<SessionData> {
        self.inner.get(session_id).map(|e| e.clone())
    }

    /// Bind an authenticated user to the session. The CSRF token is rotated
    /// on privilege change.
    pub fn login(&self, session_id: &str, user_id: Uuid, role: UserRole) {
        if let Some(mut entry) = self.inner.get_mut(session_id) {
            entry.user_id = Some(user_id);
            entry.role = Some(role);
            entry.csrf_token = Self::random_token(32);
        }
    }

    pub fn destroy(&self, session_id: &str) {
        self.inner.remove(session_id);
    }

    pub fn csrf_token(&self, session_id: &str) -> Option<String> {
        self.inner.get(session_id).map(|e| e.csrf_token.clone())
    }

    /// Validate a submitted CSRF token against the session's issued token.
    pub fn verify_csrf(&self, session_id: &str, candidate: &str) -> bool {
        match self.inner.get(session_id) {
            Some(entry) => !candidate.is_empty() && entry.csrf_token == candidate,
            None => false,
        }
    }

    pub fn push_flash(&self, session_id: &str, level: FlashLevel, message: impl Into<String>) {
        if let Some(mut entry) = self.inner.get_mut(session_id) {
            entry.flash.push(FlashMessage {
                level,
                message: message.into(),
            });
        }
    }

    /// Drain pending flash messages (read-once semantics).
    pub fn take_flash(&self, session_id: &str) -> Vec<FlashMessage> {
        self.inner
            .get_mut(session_id)
            .map(|mut e| std::mem::take(&mut e.flash))
            .unwrap_or_default()
    }
}

/// Request-scoped session handle.
///
/// `cookie` is `Some` only when a fresh session was created for this
/// request, in which case the handler should emit a `Set-Cookie` header.
#[derive(Clone)]
pub struct Session {
    pub id: String,
    pub data: SessionData,
    pub cookie: Option<String>,
    pub store: Arc<SessionStore>,
}

impl Session {
    pub fn user_id(&self) -> Option<Uuid> {
        self.data.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.user_id.is_some()
    }

    pub fn set_cookie_header(&self) -> Option<String> {
        self.cookie.as_ref().map(|value| {
            format!("{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax")
        })
    }
}

fn cookie_from_parts(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(http::header::COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

#[async_trait::async_trait]
impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let store = state.sessions.clone();

        if let Some(raw) = cookie_from_parts(parts) {
            if let Some(id) = store.resolve(&raw) {
                let data = store
                    .get(&id)
                    .ok_or_else(|| ServiceError::InternalError("session vanished".into()))?;
                return Ok(Session {
                    id,
                    data,
                    cookie: None,
                    store,
                });
            }
        }

        let (id, cookie) = store.create();
        let data = store
            .get(&id)
            .ok_or_else(|| ServiceError::InternalError("session vanished".into()))?;
        Ok(Session {
            id,
            data,
            cookie: Some(cookie),
            store,
        })
    }
}
