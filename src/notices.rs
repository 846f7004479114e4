//! Per-request informational notices.
//!
//! Services push notices while handling a request; the response envelope
//! drains them exactly once into its `notify` field.

use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::error::ErrorEnvelope;

/// Queue of pending "info" notices scoped to a single request
#[derive(Debug, Clone, Default)]
pub struct Notices {
    queue: Arc<Mutex<Vec<String>>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an informational notice for the current response
    pub fn info(&self, message: impl Into<String>) {
        self.lock().push(message.into());
    }

    /// Drain all pending notices. A second call returns nothing.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        // A poisoned queue still holds plain strings
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Middleware installing a fresh notice queue on every request.
///
/// Error envelopes are rebuilt here when notices were queued before the
/// failure, so they are delivered instead of dropped.
pub async fn attach_notices(mut request: Request, next: Next) -> Response {
    let notices = Notices::new();
    request.extensions_mut().insert(notices.clone());

    let mut response = next.run(request).await;
    if notices.is_empty() {
        return response;
    }
    match response.extensions_mut().remove::<ErrorEnvelope>() {
        Some(envelope) => envelope.into_response_with(&notices),
        None => response,
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Notices
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(notices) = parts.extensions.get::<Notices>() {
            return Ok(notices.clone());
        }
        let notices = Notices::new();
        parts.extensions.insert(notices.clone());
        Ok(notices)
    }
}
