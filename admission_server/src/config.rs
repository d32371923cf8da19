use std::{env, time::Duration};

use admission_common::{parse_or_default, Secret};
use admission_engine::notifications::RetryPolicy;
use log::*;
use provider_tools::ProviderConfig;

const DEFAULT_EDU_HOST: &str = "127.0.0.1";
const DEFAULT_EDU_PORT: u16 = 8000;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/admissions.db";
const DEFAULT_NOTIFY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_NOTIFY_BACKOFF_MS: u64 = 500;
const DEFAULT_NOTIFY_BUFFER: usize = 256;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    pub notifications: NotificationConfig,
    /// Payment gateway, broker, push relay and document storage settings
    pub providers: ProviderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_EDU_HOST.to_string(),
            port: DEFAULT_EDU_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            notifications: NotificationConfig::default(),
            providers: ProviderConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("EDU_HOST").ok().unwrap_or_else(|| DEFAULT_EDU_HOST.into());
        let port = env::var("EDU_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for EDU_PORT. {e} Using the default, {DEFAULT_EDU_PORT}, instead."
                    );
                    DEFAULT_EDU_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_EDU_PORT);
        let database_url = env::var("EDU_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ EDU_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::from_env_or_default();
        let notifications = NotificationConfig::from_env_or_default();
        let providers = ProviderConfig::new_from_env_or_default();
        Self { host, port, database_url, auth, notifications, providers }
    }

    /// How long a charge stays payable when the gateway does not say.
    pub fn expiry_grace(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.providers.gateway.expiry_minutes)
    }
}

//--------------------------------------     AuthConfig      ---------------------------------------------------------
/// Access tokens are issued by the account service; this server only verifies them.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    /// The HS256 key shared with the account service
    pub jwt_secret: Secret<String>,
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        let jwt_secret = env::var("EDU_JWT_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ EDU_JWT_SECRET is not set. Every authenticated request will be rejected until it is set to the \
                 account service's signing key."
            );
            String::default()
        });
        Self { jwt_secret: Secret::new(jwt_secret) }
    }
}

//--------------------------------------  NotificationConfig ---------------------------------------------------------
#[derive(Clone, Debug)]
pub struct NotificationConfig {
    /// Broker delivery attempts per message, including the first
    pub max_attempts: u32,
    /// Delay before the first retry. Doubles on every retry.
    pub backoff: Duration,
    /// Capacity of the broker delivery queue
    pub buffer_size: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_NOTIFY_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_NOTIFY_BACKOFF_MS),
            buffer_size: DEFAULT_NOTIFY_BUFFER,
        }
    }
}

impl NotificationConfig {
    pub fn from_env_or_default() -> Self {
        let max_attempts = parse_or_default(env::var("EDU_NOTIFY_MAX_ATTEMPTS").ok(), DEFAULT_NOTIFY_MAX_ATTEMPTS);
        if max_attempts == 0 {
            warn!("🪛️ EDU_NOTIFY_MAX_ATTEMPTS is 0. Each broker message will still be attempted once.");
        }
        let backoff_ms = parse_or_default(env::var("EDU_NOTIFY_BACKOFF_MS").ok(), DEFAULT_NOTIFY_BACKOFF_MS);
        let buffer_size = parse_or_default(env::var("EDU_NOTIFY_BUFFER").ok(), DEFAULT_NOTIFY_BUFFER).max(1);
        Self { max_attempts, backoff: Duration::from_millis(backoff_ms), buffer_size }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.backoff)
    }
}
