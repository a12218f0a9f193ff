use async_trait::async_trait;
use serde_json::{json, Value};

use super::{credential, parse_body, PixError, PixGateway};
use crate::models::pix::{GatewayStatusResponse, OrderData, PagSeguroOrder, PaymentStatusUpdate, PixPayment};
use crate::settings::{Environment, GatewayConfig};
use crate::utils;

pub const NAME: &str = "pagseguro";

const SANDBOX_URL: &str = "https://ws.sandbox.pagseguro.uol.com.br";
const PRODUCTION_URL: &str = "https://ws.pagseguro.uol.com.br";

pub struct PagSeguroGateway {
    base_url: String,
    access_token: String,
    webhook_url: Option<String>,
    client: reqwest::Client,
}

pub fn build(config: &GatewayConfig) -> Result<Box<dyn PixGateway>, PixError> {
    Ok(Box::new(PagSeguroGateway::new(config)?))
}

impl PagSeguroGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, PixError> {
        let base_url = match config.environment {
            Environment::Sandbox => SANDBOX_URL,
            Environment::Production => PRODUCTION_URL,
        };

        Ok(PagSeguroGateway {
            base_url: base_url.to_string(),
            access_token: credential(config, NAME, "access_token")?,
            webhook_url: config.webhook_url.clone(),
            client: reqwest::Client::new(),
        })
    }

    fn order_body(&self, order: &OrderData) -> Value {
        let cents = utils::amount_in_cents(order.amount);
        let notification_urls: Vec<&str> = self.webhook_url.as_deref().into_iter().collect();

        json!({
            "reference_id": order
                .external_reference
                .clone()
                .unwrap_or_else(|| format!("PEDIDO_{}", chrono::Utc::now().timestamp_millis())),
            "customer": {
                "name": order.payer_name.as_deref().unwrap_or("Cliente"),
                "email": order.payer_email.as_deref().unwrap_or("cliente@exemplo.com"),
                "tax_id": order.payer_document.as_deref().unwrap_or("00000000000"),
            },
            "items": [{
                "reference_id": "ITEM_001",
                "name": order.description.as_deref().unwrap_or("Pagamento PIX"),
                "quantity": 1,
                "unit_amount": cents,
            }],
            "qr_codes": [{
                "amount": { "value": cents },
                "expiration_date": utils::expiration_timestamp(15),
            }],
            "notification_urls": notification_urls,
        })
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error_messages")
                    .and_then(|m| m.get(0))
                    .and_then(|m| m.get("description"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

fn payment_from(order: PagSeguroOrder, amount: f64) -> PixPayment {
    let qr = order.qr_codes.into_iter().next();
    let text = qr.as_ref().and_then(|q| q.text.clone());

    PixPayment {
        id: order.id,
        // PagSeguro's order creation response carries no charge status yet.
        status: "pending".to_string(),
        qr_code: text.clone(),
        qr_code_base64: None,
        pix_code: text,
        expires_at: qr.and_then(|q| q.expiration_date),
        amount,
        gateway: NAME.to_string(),
        external_reference: order.reference_id,
    }
}

#[async_trait]
impl PixGateway for PagSeguroGateway {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn create_charge(&self, order: &OrderData) -> Result<PixPayment, PixError> {
        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&self.order_body(order))
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

        let created: PagSeguroOrder = parse_body(NAME, &body)?;
        Ok(payment_from(created, order.amount))
    }

    async fn get_status(&self, payment_id: &str) -> Result<PaymentStatusUpdate, PixError> {
        let response = self
            .client
            .get(format!("{}/orders/{}", self.base_url, payment_id))
            .bearer_auth(&self.access_token)
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn gateway(environment: Environment) -> PagSeguroGateway {
        PagSeguroGateway::new(&GatewayConfig {
            provider: NAME.to_string(),
            environment,
            credentials: HashMap::from([("access_token".to_string(), "token".to_string())]),
            webhook_url: None,
        })
        .unwrap()
    }

    #[test]
    fn test_environment_selects_base_url() {
        assert_eq!(gateway(Environment::Sandbox).base_url, SANDBOX_URL);
        assert_eq!(gateway(Environment::Production).base_url, PRODUCTION_URL);
    }

    #[test]
    fn test_order_body_uses_centavos() {
        let body = gateway(Environment::Sandbox).order_body(&OrderData {
            amount: 28.0,
            description: None,
            payer_name: None,
            payer_email: None,
            payer_document: None,
            external_reference: Some("PEDIDO_1".to_string()),
            customer_id: None,
        });

        assert_eq!(body["items"][0]["unit_amount"], 2800);
        assert_eq!(body["qr_codes"][0]["amount"]["value"], 2800);
        assert_eq!(body["notification_urls"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_payment_from_order_response() {
        let order: PagSeguroOrder = serde_json::from_value(json!({
            "id": "ORDE_123",
            "reference_id": "PEDIDO_1",
            "qr_codes": [{
                "text": "000201pagseguro",
                "expiration_date": "2024-01-01T00:15:00-03:00",
            }],
        }))
        .unwrap();

        let payment = payment_from(order, 28.0);
        assert_eq!(payment.id, "ORDE_123");
        assert_eq!(payment.status, "pending");
        assert_eq!(payment.pix_code.as_deref(), Some("000201pagseguro"));
        assert!(payment.qr_code_base64.is_none());
        assert_eq!(payment.amount, 28.0);
        assert_eq!(payment.external_reference.as_deref(), Some("PEDIDO_1"));
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error_messages":[{"description":"invalid parameter"}]}"#;
        assert_eq!(PagSeguroGateway::error_message(body), "invalid parameter");
        assert_eq!(PagSeguroGateway::error_message("{}"), "unknown error");
    }
}
