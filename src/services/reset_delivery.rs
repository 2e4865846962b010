use async_trait::async_trait;

use crate::crypto::token::ResetToken;
use crate::error::Result;

/// Hands a freshly issued reset token to the user through an out-of-band channel.
#[async_trait]
pub trait ResetDelivery: Send + Sync {
    async fn deliver(&self, email: &str, token: &ResetToken) -> Result<()>;
}

/// Delivery used until a real notification channel exists.
///
/// Outside production the reset link is written to the debug log so the flow
/// can be exercised locally. In production nothing leaves the process.
pub struct LogDelivery {
    production: bool,
}

impl LogDelivery {
    pub fn new(production: bool) -> Self {
        Self { production }
    }
}

#[async_trait]
impl ResetDelivery for LogDelivery {
    async fn deliver(&self, email: &str, token: &ResetToken) -> Result<()> {
        if self.production {
            tracing::warn!("⚠️  No reset delivery channel configured; reset for {} not sent", email);
        } else {
            tracing::debug!("📨 Reset link for {}: /reset-password?token={}", email, token.as_str());
        }
        Ok(())
    }
}
