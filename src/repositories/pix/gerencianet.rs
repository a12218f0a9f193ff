use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::{credential, parse_body, PixError, PixGateway};
use crate::models::pix::{
    GatewayStatusResponse, GerencianetCharge, GerencianetQrCode, GerencianetToken, OrderData,
    PaymentStatusUpdate, PixPayment,
};
use crate::settings::{Environment, GatewayConfig};
use crate::utils;

pub const NAME: &str = "gerencianet";

const SANDBOX_URL: &str = "https://api-pix-h.gerencianet.com.br";
const PRODUCTION_URL: &str = "https://api-pix.gerencianet.com.br";

// Seconds subtracted from a token's lifetime before it counts as stale.
const TOKEN_EXPIRY_MARGIN: i64 = 60;

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct GerencianetGateway {
    base_url: String,
    pix_key: String,
    static_token: Option<String>,
    oauth_credentials: Option<(String, String)>,
    token_cache: RwLock<Option<CachedToken>>,
    client: reqwest::Client,
}

pub fn build(config: &GatewayConfig) -> Result<Box<dyn PixGateway>, PixError> {
    Ok(Box::new(GerencianetGateway::new(config)?))
}

impl GerencianetGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, PixError> {
        let base_url = match config.environment {
            Environment::Sandbox => SANDBOX_URL,
            Environment::Production => PRODUCTION_URL,
        };

        let oauth_credentials = config
            .credential("client_id")
            .zip(config.credential("client_secret"))
            .map(|(id, secret)| (id.to_string(), secret.to_string()));
        let static_token = config.credential("access_token").map(str::to_string);

        if oauth_credentials.is_none() && static_token.is_none() {
            return Err(PixError::MissingCredential {
                gateway: NAME,
                key: "access_token",
            });
        }

        Ok(GerencianetGateway {
            base_url: base_url.to_string(),
            pix_key: credential(config, NAME, "pix_key")?,
            static_token,
            oauth_credentials,
            token_cache: RwLock::new(None),
            client: reqwest::Client::new(),
        })
    }

    fn charge_body(&self, order: &OrderData) -> Value {
        json!({
            "calendario": { "expiracao": 900 },
            "devedor": {
                "cpf": order.payer_document.as_deref().unwrap_or("00000000000"),
                "nome": order.payer_name.as_deref().unwrap_or("Cliente"),
            },
            "valor": { "original": utils::format_amount(order.amount) },
            "chave": self.pix_key,
            "solicitacaoPagador": order.description.as_deref().unwrap_or("Pagamento PIX"),
        })
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| "unknown error".to_string())
    }

    /// Client-credentials OAuth with a cached token; a statically
    /// configured access_token bypasses the flow entirely.
    async fn token(&self) -> Result<String, PixError> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = &*cache {
                if cached.expires_at > Utc::now() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let (client_id, client_secret) = match &self.oauth_credentials {
            Some(pair) => pair,
            None => {
                return Err(PixError::MissingCredential {
                    gateway: NAME,
                    key: "client_id",
                })
            }
        };

        let response = self
            .client
            .post(format!("{}/oauth/token", self.base_url))
            .basic_auth(client_id, Some(client_secret))
            .json(&json!({ "grant_type": "client_credentials" }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PixError::Gateway {
                gateway: NAME,
                message: Self::error_message(&body),
            });
        }

        let token: GerencianetToken = parse_body(NAME, &body)?;
        let lifetime = token.expires_in.unwrap_or(3600) - TOKEN_EXPIRY_MARGIN;

        let mut cache = self.token_cache.write().await;
        *cache = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(lifetime.max(0)),
        });

        Ok(token.access_token)
    }

    async fn fetch_qr_code(&self, token: &str, location_id: i64) -> Option<GerencianetQrCode> {
        let response = self
            .client
            .get(format!("{}/v2/loc/{}/qrcode", self.base_url, location_id))
            .bearer_auth(token)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            log::warn!("gerencianet: qrcode lookup returned {}", response.status());
            return None;
        }

        response.json::<GerencianetQrCode>().await.ok()
    }
}

fn payment_from(charge: GerencianetCharge, qr: Option<GerencianetQrCode>, amount: f64) -> PixPayment {
    let qrcode = qr.as_ref().and_then(|q| q.qrcode.clone());
    let image = qr.and_then(|q| q.imagem_qrcode);

    PixPayment {
        external_reference: Some(charge.txid.clone()),
        id: charge.txid,
        status: charge.status.to_lowercase(),
        qr_code: qrcode.clone(),
        qr_code_base64: image,
        pix_code: qrcode,
        expires_at: Some(utils::expiration_timestamp(15)),
        amount,
        gateway: NAME.to_string(),
    }
}

#[async_trait]
impl PixGateway for GerencianetGateway {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn create_charge(&self, order: &OrderData) -> Result<PixPayment, PixError> {
        let token = self.token().await?;

        // The txid is generated locally and keys every later call.
        let txid = utils::generate_txid();

        let response = self
            .client
            .put(format!("{}/v2/cob/{}", self.base_url, txid))
            .bearer_auth(&token)
            .json(&self.charge_body(order))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PixError::Gateway {
                gateway: NAME,
                message: Self::error_message(&body),
            });
        }

        let charge: GerencianetCharge = parse_body(NAME, &body)?;
        let qr = self.fetch_qr_code(&token, charge.loc.id).await;
        Ok(payment_from(charge, qr, order.amount))
    }

    async fn get_status(&self, payment_id: &str) -> Result<PaymentStatusUpdate, PixError> {
        let token = self.token().await?;

        let response = self
            .client
            .get(format!("{}/v2/cob/{}", self.base_url, payment_id))
            .bearer_auth(&token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PixError::Gateway {
                gateway: NAME,
                message: Self::error_message(&body),
            });
        }

        let lookup: GatewayStatusResponse = parse_body(NAME, &body)?;
        Ok(PaymentStatusUpdate {
            status: lookup.status.to_lowercase(),
            gateway: NAME.to_string(),
        })
    }
}
