use std::collections::HashMap;

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    Production,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GatewayConfig {
    pub provider: String,
    pub environment: Environment,
    #[serde(default)]
    pub credentials: HashMap<String, String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl GatewayConfig {
    pub fn credential(&self, key: &str) -> Option<&str> {
        self.credentials.get(key).map(String::as_str)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Checkout {
    #[serde(default = "default_expiration_secs")]
    pub expiration_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_expiration_secs() -> u64 {
    900
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for Checkout {
    fn default() -> Self {
        Checkout {
            expiration_secs: default_expiration_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub checkout: Checkout,
    pub server: Server,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config.toml"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_settings_parse_full() {
        let settings = parse(
            r#"
            [server]
            listen = "127.0.0.1:9000"

            [checkout]
            expiration_secs = 600
            poll_interval_secs = 10

            [gateway]
            provider = "asaas"
            environment = "production"
            webhook_url = "https://example.com/webhooks/pix"

            [gateway.credentials]
            api_key = "abc123"
            "#,
        );

        assert_eq!(settings.server.listen, "127.0.0.1:9000");
        assert_eq!(settings.checkout.expiration_secs, 600);
        assert_eq!(settings.checkout.poll_interval_secs, 10);
        assert_eq!(settings.gateway.provider, "asaas");
        assert_eq!(settings.gateway.environment, Environment::Production);
        assert_eq!(settings.gateway.credential("api_key"), Some("abc123"));
        assert_eq!(settings.gateway.credential("missing"), None);
    }

    #[test]
    fn test_settings_checkout_defaults() {
        let settings = parse(
            r#"
            [server]

            [gateway]
            provider = "mercadopago"
            environment = "sandbox"

            [gateway.credentials]
            access_token = "TEST-token"
            "#,
        );

        assert_eq!(settings.checkout.expiration_secs, 900);
        assert_eq!(settings.checkout.poll_interval_secs, 5);
        assert_eq!(settings.server.listen, "0.0.0.0:8080");
        assert_eq!(settings.gateway.environment, Environment::Sandbox);
        assert!(settings.gateway.webhook_url.is_none());
    }
}
