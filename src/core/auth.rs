//! Authentication collaborator
//!
//! The framework never owns identity. An [`AuthProvider`] turns request
//! headers into an optional [`Actor`]; derived operations only see the actor,
//! never the credentials.

use anyhow::Result;
use async_trait::async_trait;
use axum::http::HeaderMap;
use uuid::Uuid;

/// The authenticated caller, as resolved by the identity subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    /// Preferred currency code used to resolve money-field defaults
    pub preferred_currency: Option<String>,
}

impl Actor {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            preferred_currency: None,
        }
    }

    pub fn with_preferred_currency(mut self, code: impl Into<String>) -> Self {
        self.preferred_currency = Some(code.into());
        self
    }
}

/// Trait for auth providers supplied by an external identity subsystem.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Extract the acting identity from request headers.
    ///
    /// `Ok(None)` means anonymous; `Err` means the identity subsystem itself
    /// failed.
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Actor>>;
}

/// Provider that treats every request as anonymous.
pub struct NoAuthProvider;

#[async_trait]
impl AuthProvider for NoAuthProvider {
    async fn authenticate(&self, _headers: &HeaderMap) -> Result<Option<Actor>> {
        Ok(None)
    }
}

/// Development provider reading the actor from plain headers.
///
/// `x-actor-id` carries the actor's UUID and `x-preferred-currency` an
/// optional currency code. Not for production use.
pub struct HeaderAuthProvider;

impl HeaderAuthProvider {
    pub const ACTOR_HEADER: &'static str = "x-actor-id";
    pub const CURRENCY_HEADER: &'static str = "x-preferred-currency";
}

#[async_trait]
impl AuthProvider for HeaderAuthProvider {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Actor>> {
        let Some(raw) = headers.get(Self::ACTOR_HEADER) else {
            return Ok(None);
        };
        let id = Uuid::parse_str(raw.to_str()?)?;

        let preferred_currency = headers
            .get(Self::CURRENCY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(Some(Actor {
            id,
            preferred_currency,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_auth_is_anonymous() {
        let provider = NoAuthProvider;
        let actor = provider.authenticate(&HeaderMap::new()).await.unwrap();
        assert!(actor.is_none());
    }

    #[tokio::test]
    async fn test_header_auth_extracts_actor() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert("x-actor-id", id.to_string().parse().unwrap());
        headers.insert("x-preferred-currency", "EUR".parse().unwrap());

        let actor = HeaderAuthProvider
            .authenticate(&headers)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(actor.id, id);
        assert_eq!(actor.preferred_currency.as_deref(), Some("EUR"));
    }

    #[tokio::test]
    async fn test_header_auth_missing_header_is_anonymous() {
        let actor = HeaderAuthProvider
            .authenticate(&HeaderMap::new())
            .await
            .unwrap();
        assert!(actor.is_none());
    }

    #[tokio::test]
    async fn test_header_auth_malformed_id_fails() {
        let mut headers = HeaderMap::new();
        headers.insert("x-actor-id", "not-a-uuid".parse().unwrap());
        assert!(HeaderAuthProvider.authenticate(&headers).await.is_err());
    }
}
