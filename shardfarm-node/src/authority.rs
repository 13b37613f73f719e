//! Remote authority transport
//!
//! [`Authority`] is the seam between the retrying client and the wire.
//! [`HttpAuthority`] speaks the farmer HTTP API; tests substitute their own
//! implementations.

use reqwest::StatusCode;
use shardfarm_core::error::{FarmError, Result};
use shardfarm_core::PayoutAddress;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The three calls the authority understands.
///
/// Implementations classify failures into [`FarmError`] variants; the
/// retrying client decides what to do with them.
#[async_trait::async_trait]
pub trait Authority: Send + Sync {
    /// Register the farmer with the address that should receive payouts
    async fn register(&self, payout_address: &PayoutAddress) -> Result<()>;

    /// Keep-alive
    async fn ping(&self) -> Result<()>;

    /// Report the settled build height
    async fn report_height(&self, height: u64) -> Result<()>;
}

#[async_trait::async_trait]
impl<A: Authority + ?Sized> Authority for std::sync::Arc<A> {
    async fn register(&self, payout_address: &PayoutAddress) -> Result<()> {
        (**self).register(payout_address).await
    }

    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }

    async fn report_height(&self, height: u64) -> Result<()> {
        (**self).report_height(height).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Register,
    Ping,
    Height,
}

/// Authority reached over HTTP
pub struct HttpAuthority {
    base_url: String,
    auth_address: PayoutAddress,
    client: reqwest::Client,
}

impl HttpAuthority {
    /// Create a client authenticating as `auth_address`
    pub fn new(base_url: &str, auth_address: PayoutAddress) -> Result<Self> {
        Self::with_timeout(base_url, auth_address, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        auth_address: PayoutAddress,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FarmError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_address,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_address(&self) -> &PayoutAddress {
        &self.auth_address
    }

    async fn call(&self, call: Call, path: String) -> Result<()> {
        let url = format!("{}/api/{}", self.base_url, path);
        debug!(url = %url, "Calling authority");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                let message = format!("{}: {}", url, e);
                return Err(match call {
                    Call::Register => FarmError::RegistrationFailed(message),
                    Call::Ping | Call::Height => FarmError::Transport(message),
                });
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify(call, status, &body))
    }
}

/// Map a non-success HTTP status to the error callers react to
fn classify(call: Call, status: StatusCode, body: &str) -> FarmError {
    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body.trim())
    };

    match status {
        StatusCode::CONFLICT if call == Call::Register => FarmError::AlreadyRegistered(message),
        StatusCode::BAD_REQUEST if call == Call::Register => FarmError::InvalidAddress(message),
        StatusCode::TOO_MANY_REQUESTS => transient(call, message),
        s if s.is_server_error() => transient(call, message),
        _ => FarmError::Rejected(message),
    }
}

fn transient(call: Call, message: String) -> FarmError {
    match call {
        Call::Register => FarmError::RegistrationFailed(message),
        Call::Ping | Call::Height => FarmError::Transport(message),
    }
}

#[async_trait::async_trait]
impl Authority for HttpAuthority {
    #[instrument(skip(self), fields(payout = %payout_address))]
    async fn register(&self, payout_address: &PayoutAddress) -> Result<()> {
        let path = format!("register/{}/{}", self.auth_address, payout_address);
        self.call(Call::Register, path).await
    }

    async fn ping(&self) -> Result<()> {
        let path = format!("ping/{}", self.auth_address);
        self.call(Call::Ping, path).await
    }

    #[instrument(skip(self))]
    async fn report_height(&self, height: u64) -> Result<()> {
        let path = format!("height/{}/{}", self.auth_address, height);
        self.call(Call::Height, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_register() {
        assert!(matches!(
            classify(Call::Register, StatusCode::CONFLICT, ""),
            FarmError::AlreadyRegistered(_)
        ));
        assert!(matches!(
            classify(Call::Register, StatusCode::BAD_REQUEST, "bad address"),
            FarmError::InvalidAddress(_)
        ));
        assert!(matches!(
            classify(Call::Register, StatusCode::SERVICE_UNAVAILABLE, ""),
            FarmError::RegistrationFailed(_)
        ));
        assert!(matches!(
            classify(Call::Register, StatusCode::NOT_FOUND, ""),
            FarmError::Rejected(_)
        ));
    }

    #[test]
    fn test_classify_ping_and_height() {
        for call in [Call::Ping, Call::Height] {
            assert!(matches!(
                classify(call, StatusCode::INTERNAL_SERVER_ERROR, ""),
                FarmError::Transport(_)
            ));
            assert!(matches!(
                classify(call, StatusCode::TOO_MANY_REQUESTS, ""),
                FarmError::Transport(_)
            ));
            assert!(matches!(
                classify(call, StatusCode::CONFLICT, ""),
                FarmError::Rejected(_)
            ));
            assert!(matches!(
                classify(call, StatusCode::BAD_REQUEST, ""),
                FarmError::Rejected(_)
            ));
            assert!(matches!(
                classify(call, StatusCode::NOT_FOUND, "unknown farmer"),
                FarmError::Rejected(_)
            ));
            assert!(matches!(
                classify(call, StatusCode::FORBIDDEN, ""),
                FarmError::Rejected(_)
            ));
        }
    }

    #[test]
    fn test_classify_keeps_body() {
        let err = classify(Call::Height, StatusCode::NOT_FOUND, " unknown farmer \n");
        assert!(err.to_string().contains("unknown farmer"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let address = PayoutAddress::parse("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").unwrap();
        let authority = HttpAuthority::new("http://localhost:5000/", address).unwrap();
        assert_eq!(authority.base_url(), "http://localhost:5000");
    }
}
