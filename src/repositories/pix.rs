use async_trait::async_trait;

use crate::models::pix::{OrderData, PaymentStatusUpdate, PixPayment};
use crate::settings::GatewayConfig;

mod asaas;
mod gerencianet;
mod mercadopago;
#[cfg(test)]
pub mod mock;
mod pagseguro;

#[derive(Debug, thiserror::Error)]
pub enum PixError {
    #[error("unsupported gateway: {0}")]
    UnsupportedGateway(String),
    #[error("{gateway} error: {message}")]
    Gateway {
        gateway: &'static str,
        message: String,
    },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("missing credential '{key}' for gateway {gateway}")]
    MissingCredential {
        gateway: &'static str,
        key: &'static str,
    },
    #[error("{gateway}: bad response format: {message}")]
    Malformed {
        gateway: &'static str,
        message: String,
    },
}

/// The single seam every provider implements: create a charge, look up its
/// status. Status strings keep the provider's own vocabulary, lower-cased.
#[async_trait]
pub trait PixGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_charge(&self, order: &OrderData) -> Result<PixPayment, PixError>;

    async fn get_status(&self, payment_id: &str) -> Result<PaymentStatusUpdate, PixError>;
}

type GatewayBuilder = fn(&GatewayConfig) -> Result<Box<dyn PixGateway>, PixError>;

static REGISTRY: &[(&str, GatewayBuilder)] = &[
    (mercadopago::NAME, mercadopago::build),
    (pagseguro::NAME, pagseguro::build),
    (asaas::NAME, asaas::build),
    (gerencianet::NAME, gerencianet::build),
];

pub struct PixClient {
    gateway: Box<dyn PixGateway>,
}

impl std::fmt::Debug for PixClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixClient")
            .field("gateway", &self.gateway.name())
            .finish()
    }
}

impl PixClient {
    /// Resolves the configured provider to its adapter. Unknown provider
    /// names and missing credentials fail here, before any network call.
    pub fn new(config: &GatewayConfig) -> Result<Self, PixError> {
        let builder = REGISTRY
            .iter()
            .find(|(name, _)| *name == config.provider)
            .map(|(_, builder)| builder)
            .ok_or_else(|| PixError::UnsupportedGateway(config.provider.clone()))?;

        Ok(PixClient {
            gateway: builder(config)?,
        })
    }

    #[cfg(test)]
    pub fn from_gateway(gateway: Box<dyn PixGateway>) -> Self {
        PixClient { gateway }
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway.name()
    }

    pub async fn create_pix_payment(&self, order: &OrderData) -> Result<PixPayment, PixError> {
        self.gateway.create_charge(order).await
    }

    pub async fn get_payment_status(&self, id: &str) -> Result<PaymentStatusUpdate, PixError> {
        self.gateway.get_status(id).await
    }
}

fn credential(
    config: &GatewayConfig,
    gateway: &'static str,
    key: &'static str,
) -> Result<String, PixError> {
    config
        .credential(key)
        .map(str::to_string)
        .ok_or(PixError::MissingCredential { gateway, key })
}

fn parse_body<T: serde::de::DeserializeOwned>(
    gateway: &'static str,
    body: &str,
) -> Result<T, PixError> {
    serde_json::from_str(body).map_err(|e| PixError::Malformed {
        gateway,
        message: e.to_string(),
    })
}
