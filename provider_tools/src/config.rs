use std::{collections::HashMap, env};

use admission_common::{parse_boolean_flag, parse_or_default, Secret};
use admission_engine::events::Topic;
use log::*;

const DEFAULT_GATEWAY_URL: &str = "https://api.sandbox.midtrans.com";
const DEFAULT_EXPIRY_MINUTES: i64 = 1440;
const DEFAULT_NSQ_URL: &str = "http://127.0.0.1:4151";
const DEFAULT_STORAGE_URL: &str = "https://storage.googleapis.com";

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{key} not set, using {default} as default");
        default.to_string()
    })
}

fn secret_env(key: &str) -> Secret<String> {
    Secret::new(env::var(key).unwrap_or_else(|_| {
        warn!("{key} not set. Requests that need it will be rejected by the provider.");
        String::default()
    }))
}

//--------------------------------------   MidtransConfig    ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct MidtransConfig {
    pub base_url: String,
    pub server_key: Secret<String>,
    /// How long a charge stays payable, in minutes.
    pub expiry_minutes: i64,
    /// Check the signature on payment notifications.
    pub verify_signature: bool,
}

impl Default for MidtransConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            server_key: Secret::default(),
            expiry_minutes: DEFAULT_EXPIRY_MINUTES,
            verify_signature: true,
        }
    }
}

impl MidtransConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = env_or("EDU_GATEWAY_BASE_URL", DEFAULT_GATEWAY_URL);
        let server_key = secret_env("EDU_GATEWAY_SERVER_KEY");
        let expiry_minutes = parse_or_default(env::var("EDU_GATEWAY_EXPIRY_MINUTES").ok(), DEFAULT_EXPIRY_MINUTES);
        let verify_signature = parse_boolean_flag(env::var("EDU_GATEWAY_VERIFY_SIGNATURE").ok(), true);
        if !verify_signature {
            warn!("🪛️ Payment notification signatures will NOT be checked. Do not run like this in production.");
        }
        Self { base_url, server_key, expiry_minutes, verify_signature }
    }
}

//--------------------------------------      NsqConfig      ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NsqConfig {
    /// Base URL of the nsqd HTTP interface
    pub url: String,
    /// Topic names by topic number
    pub topics: HashMap<u8, String>,
}

impl Default for NsqConfig {
    fn default() -> Self {
        Self { url: DEFAULT_NSQ_URL.to_string(), topics: HashMap::new() }
    }
}

impl NsqConfig {
    pub fn new_from_env_or_default() -> Self {
        let url = env_or("EDU_NSQ_URL", DEFAULT_NSQ_URL);
        let topics = (1..=9u8)
            .filter_map(|n| env::var(format!("EDU_NSQ_TOPIC_{n}")).ok().map(|name| (n, name)))
            .collect::<HashMap<_, _>>();
        for topic in Topic::ALL {
            if !topics.contains_key(&topic.number()) {
                let n = topic.number();
                warn!("EDU_NSQ_TOPIC_{n} not set, publishing {topic} messages to topic '{n}'");
            }
        }
        Self { url, topics }
    }

    /// The broker topic name for the topic number. Unmapped numbers are published under the number itself.
    pub fn topic_name(&self, topic: Topic) -> String {
        self.topics.get(&topic.number()).cloned().unwrap_or_else(|| topic.number().to_string())
    }
}

//--------------------------------------     PushConfig      ---------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct PushConfig {
    /// The push relay's trigger endpoint
    pub url: String,
    pub app_key: String,
    pub secret: Secret<String>,
    pub channel: String,
    /// Event names for push event numbers 1 (payment) and 2 (admission)
    pub events: [String; 2],
}

impl PushConfig {
    pub fn new_from_env_or_default() -> Self {
        let url = env_or("EDU_PUSH_URL", "http://127.0.0.1:6001/events");
        let app_key = env_or("EDU_PUSH_APP_KEY", "");
        let secret = secret_env("EDU_PUSH_SECRET");
        let channel = env_or("EDU_PUSH_CHANNEL", "admissions");
        let events = [env_or("EDU_PUSH_EVENT_1", "payment"), env_or("EDU_PUSH_EVENT_2", "admission")];
        Self { url, app_key, secret, channel, events }
    }

    /// The event name for a push event number, if the number is known.
    pub fn event_name(&self, number: u8) -> Option<&str> {
        match number {
            1 | 2 => Some(self.events[usize::from(number - 1)].as_str()),
            _ => None,
        }
    }
}

//--------------------------------------    StorageConfig    ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_url: String,
    pub bucket: String,
    /// Prefix prepended to every object name, e.g. `admissions/`
    pub path: String,
    pub token: Secret<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STORAGE_URL.to_string(),
            bucket: String::default(),
            path: String::default(),
            token: Secret::default(),
        }
    }
}

impl StorageConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = env_or("EDU_STORAGE_URL", DEFAULT_STORAGE_URL);
        let bucket = env_or("EDU_STORAGE_BUCKET", "admissions");
        let path = env::var("EDU_STORAGE_PATH").unwrap_or_default();
        let token = secret_env("EDU_STORAGE_TOKEN");
        Self { base_url, bucket, path, token }
    }
}

//--------------------------------------   ProviderConfig    ---------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub gateway: MidtransConfig,
    pub nsq: NsqConfig,
    pub push: PushConfig,
    pub storage: StorageConfig,
}

impl ProviderConfig {
    pub fn new_from_env_or_default() -> Self {
        Self {
            gateway: MidtransConfig::new_from_env_or_default(),
            nsq: NsqConfig::new_from_env_or_default(),
            push: PushConfig::new_from_env_or_default(),
            storage: StorageConfig::new_from_env_or_default(),
        }
    }
}
