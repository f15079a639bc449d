//! Bearer credentials attached to queued requests.

use async_trait::async_trait;

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";

/// Supplies the bearer token attached to actions at enqueue time.
///
/// Tokens are stored verbatim with the action. A token that expires before
/// replay shows up as a transport failure and the action is retried on a
/// later run.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current token, if signed in.
    async fn bearer_token(&self) -> Option<String>;
}

/// A fixed token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn bearer_token(&self) -> Option<String> {
        (!self.0.is_empty()).then(|| self.0.clone())
    }
}

/// Header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
