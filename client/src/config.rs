//! # Gateway Configuration & Constants
//!
//! Every magic number the client depends on lives here, next to the
//! [`GatewayConfig`] that carries the merchant's credentials.
//!
//! A `GatewayConfig` is built exactly once by the composition root and is
//! immutable afterwards. The environment (sandbox or production) is an
//! explicit field, never something read from the process environment in
//! the middle of a request.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

// ---------------------------------------------------------------------------
// Protocol Constants
// ---------------------------------------------------------------------------

/// Envelope `status` code the gateway uses for business success.
pub const GATEWAY_OK_STATUS: i64 = 200;

/// Name of the integrity field appended to every request body.
pub const HASH_FIELD: &str = "hash";

/// `req_time` layout: UTC, `YYYYMMDDHHmmss`.
pub const REQUEST_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Longest order identifier the gateway accepts.
pub const MAX_ORDER_ID_LENGTH: usize = 20;

/// Longest response body excerpt kept in a transport error.
pub const MAX_ERROR_BODY_BYTES: usize = 512;

// ---------------------------------------------------------------------------
// Operation Paths
// ---------------------------------------------------------------------------

pub const PURCHASE_PATH: &str = "purchase";
pub const TRANSACTION_DETAIL_PATH: &str = "transaction-detail";
pub const CHECK_TRANSACTION_PATH: &str = "check-transaction-2";
pub const CLOSE_TRANSACTION_PATH: &str = "close-transaction";
pub const EXCHANGE_RATE_PATH: &str = "exchange-rate";

// ---------------------------------------------------------------------------
// Timing & Defaults
// ---------------------------------------------------------------------------

/// Per-call timeout unless the caller overrides it. Checkout pages give up
/// well before this, so a slower gateway is a gateway problem.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Artificial delay applied by mock payments so UI spinners get exercised.
pub const MOCK_PAYMENT_LATENCY: Duration = Duration::from_millis(800);

/// Prefix of every synthetic transaction id. Real gateway ids never start
/// with it, so a mock id can never be mistaken for a settlement.
pub const MOCK_TRANSACTION_PREFIX: &str = "MOCK-";

/// Base URL used by `Sandbox` when none is configured: a gateway stub on
/// the developer's machine.
pub const DEFAULT_SANDBOX_BASE_URL: &str = "http://127.0.0.1:8787/api/payment-gateway/v1/payments";

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Which gateway deployment the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sandbox => write!(f, "sandbox"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "test" | "dev" => Ok(Self::Sandbox),
            "production" | "prod" | "live" => Ok(Self::Production),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a [`GatewayConfig`] cannot be built. All of them are fatal at
/// startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("merchant id is missing")]
    MissingMerchantId,

    #[error("signing secret is missing")]
    MissingSecret,

    #[error("invalid base url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("production environment requires an explicit base url")]
    MissingProductionUrl,

    #[error("production base url must use https, got {0}")]
    InsecureProductionUrl(String),

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("could not build http client: {0}")]
    HttpClient(String),

    #[error("could not register metrics: {0}")]
    Metrics(String),
}

// ---------------------------------------------------------------------------
// GatewayConfig
// ---------------------------------------------------------------------------

/// Immutable merchant configuration shared by every call.
///
/// `Clone` is cheap enough for the handful of strings involved; callers
/// that share one client across tasks wrap the client, not the config.
#[derive(Clone)]
pub struct GatewayConfig {
    merchant_id: String,
    secret: SecretString,
    rsa_public_key: Option<String>,
    rsa_private_key: Option<SecretString>,
    environment: Environment,
    base_url: Url,
    request_timeout: Duration,
}

impl GatewayConfig {
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    /// The shared signing secret. Only the signer should call this.
    pub(crate) fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub fn rsa_public_key(&self) -> Option<&str> {
        self.rsa_public_key.as_deref()
    }

    pub fn has_rsa_private_key(&self) -> bool {
        self.rsa_private_key.is_some()
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("merchant_id", &self.merchant_id)
            .field("secret", &"[REDACTED]")
            .field("rsa_public_key", &self.rsa_public_key.is_some())
            .field("rsa_private_key", &self.rsa_private_key.is_some())
            .field("environment", &self.environment)
            .field("base_url", &self.base_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// GatewayConfigBuilder
// ---------------------------------------------------------------------------

/// Collects configuration values and validates them in [`build`](Self::build).
///
/// ```rust
/// use paygate_client::config::{Environment, GatewayConfig};
///
/// let config = GatewayConfig::builder()
///     .merchant_id("ec000262")
///     .secret("sandbox-secret")
///     .environment(Environment::Sandbox)
///     .build()
///     .unwrap();
/// assert_eq!(config.merchant_id(), "ec000262");
/// ```
#[derive(Default)]
pub struct GatewayConfigBuilder {
    merchant_id: Option<String>,
    secret: Option<String>,
    rsa_public_key: Option<String>,
    rsa_private_key: Option<String>,
    environment: Option<Environment>,
    base_url: Option<String>,
    request_timeout: Option<Duration>,
}

impl GatewayConfigBuilder {
    pub fn merchant_id(mut self, merchant_id: impl Into<String>) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn rsa_public_key(mut self, key: impl Into<String>) -> Self {
        self.rsa_public_key = Some(key.into());
        self
    }

    pub fn rsa_private_key(mut self, key: impl Into<String>) -> Self {
        self.rsa_private_key = Some(key.into());
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Validates every field and produces the immutable config.
    ///
    /// Defaults: `Sandbox`, [`DEFAULT_REQUEST_TIMEOUT`], and
    /// [`DEFAULT_SANDBOX_BASE_URL`] when the environment is `Sandbox` and no
    /// base URL was given.
    pub fn build(self) -> Result<GatewayConfig, ConfigError> {
        let merchant_id = self
            .merchant_id
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .ok_or(ConfigError::MissingMerchantId)?;

        let secret = self
            .secret
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        let environment = self.environment.unwrap_or(Environment::Sandbox);

        let raw_url = match (self.base_url, environment) {
            (Some(url), _) => url,
            (None, Environment::Sandbox) => DEFAULT_SANDBOX_BASE_URL.to_string(),
            (None, Environment::Production) => return Err(ConfigError::MissingProductionUrl),
        };
        let base_url = parse_base_url(&raw_url)?;
        if environment.is_production() && base_url.scheme() != "https" {
            return Err(ConfigError::InsecureProductionUrl(raw_url));
        }

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        if request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(GatewayConfig {
            merchant_id,
            secret: SecretString::new(secret),
            rsa_public_key: self.rsa_public_key.filter(|k| !k.trim().is_empty()),
            rsa_private_key: self
                .rsa_private_key
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::new),
            environment,
            base_url,
            request_timeout,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {scheme}"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn base() -> GatewayConfigBuilder {
        GatewayConfig::builder()
            .merchant_id("merchant-1")
            .secret("s3cr3t")
    }

    #[test]
    fn sandbox_defaults() {
        let config = base().build().unwrap();
        assert_eq!(config.environment(), Environment::Sandbox);
        assert_eq!(config.base_url().as_str(), DEFAULT_SANDBOX_BASE_URL);
        assert_eq!(config.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.secret().expose_secret().len(), 6);
    }

    #[test]
    fn empty_secret_is_fatal() {
        let err = GatewayConfig::builder()
            .merchant_id("merchant-1")
            .secret("")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingSecret);
    }

    #[test]
    fn blank_merchant_id_is_fatal() {
        let err = GatewayConfig::builder()
            .merchant_id("   ")
            .secret("s3cr3t")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingMerchantId);
    }

    #[test]
    fn production_needs_https_url() {
        let err = base()
            .environment(Environment::Production)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingProductionUrl);

        let err = base()
            .environment(Environment::Production)
            .base_url("http://gateway.example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureProductionUrl(_)));

        let ok = base()
            .environment(Environment::Production)
            .base_url("https://gateway.example.com/v1")
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = base().base_url("ftp://gateway").build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = base()
            .request_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroTimeout);
    }

    #[test]
    fn debug_redacts_secret_material() {
        let config = base().rsa_private_key("-----BEGIN KEY-----").build().unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("s3cr3t"));
        assert!(!printed.contains("BEGIN KEY"));
        assert!(printed.contains("[REDACTED]"));
        assert!(config.has_rsa_private_key());
    }

    #[test]
    fn environment_parsing() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("sandbox".parse::<Environment>().unwrap(), Environment::Sandbox);
        assert!("staging".parse::<Environment>().is_err());
    }
}
