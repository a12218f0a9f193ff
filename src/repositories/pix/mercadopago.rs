use async_trait::async_trait;
use serde_json::{json, Value};

use super::{credential, parse_body, PixError, PixGateway};
use crate::models::pix::{
    GatewayStatusResponse, MercadoPagoPayment, OrderData, PaymentStatusUpdate, PixPayment,
};
use crate::settings::GatewayConfig;
use crate::utils;

pub const NAME: &str = "mercadopago";

// Mercado Pago keys sandbox vs production off the credential, not the host.
const BASE_URL: &str = "https://api.mercadopago.com";

pub struct MercadoPagoGateway {
    base_url: String,
    access_token: String,
    webhook_url: Option<String>,
    client: reqwest::Client,
}

pub fn build(config: &GatewayConfig) -> Result<Box<dyn PixGateway>, PixError> {
    Ok(Box::new(MercadoPagoGateway::new(config)?))
}

impl MercadoPagoGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, PixError> {
        Ok(MercadoPagoGateway {
            base_url: BASE_URL.to_string(),
            access_token: credential(config, NAME, "access_token")?,
            webhook_url: config.webhook_url.clone(),
            client: reqwest::Client::new(),
        })
    }

    fn charge_body(&self, order: &OrderData) -> Value {
        json!({
            "transaction_amount": order.amount,
            "description": order.description.as_deref().unwrap_or("Pagamento PIX"),
            "payment_method_id": "pix",
            "payer": {
                "email": order.payer_email.as_deref().unwrap_or("cliente@exemplo.com"),
                "first_name": order.payer_name.as_deref().unwrap_or("Cliente"),
                "identification": {
                    "type": "CPF",
                    "number": order.payer_document.as_deref().unwrap_or("00000000000"),
                },
            },
            "notification_url": self.webhook_url,
            "external_reference": order
                .external_reference
                .clone()
                .unwrap_or_else(|| format!("PEDIDO_{}", chrono::Utc::now().timestamp_millis())),
        })
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

fn payment_from(payment: MercadoPagoPayment) -> PixPayment {
    let transaction_data = payment
        .point_of_interaction
        .and_then(|poi| poi.transaction_data);
    let qr_code = transaction_data.as_ref().and_then(|t| t.qr_code.clone());
    let qr_code_base64 = transaction_data.and_then(|t| t.qr_code_base64);

    PixPayment {
        id: payment.id,
        status: payment.status.to_lowercase(),
        pix_code: qr_code.clone(),
        qr_code,
        qr_code_base64,
        expires_at: payment.date_of_expiration,
        amount: payment.transaction_amount,
        gateway: NAME.to_string(),
        external_reference: payment.external_reference,
    }
}

#[async_trait]
impl PixGateway for MercadoPagoGateway {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn create_charge(&self, order: &OrderData) -> Result<PixPayment, PixError> {
        let response = self
            .client
            .post(format!("{}/v1/payments", self.base_url))
            .bearer_auth(&self.access_token)
            .header("X-Idempotency-Key", utils::generate_idempotency_key())
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

        let payment: MercadoPagoPayment = parse_body(NAME, &body)?;
        Ok(payment_from(payment))
    }

    async fn get_status(&self, payment_id: &str) -> Result<PaymentStatusUpdate, PixError> {
        let response = self
            .client
            .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
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
    use crate::settings::Environment;
    use std::collections::HashMap;

    fn gateway() -> MercadoPagoGateway {
        MercadoPagoGateway::new(&GatewayConfig {
            provider: NAME.to_string(),
            environment: Environment::Sandbox,
            credentials: HashMap::from([(
                "access_token".to_string(),
                "TEST-token".to_string(),
            )]),
            webhook_url: Some("https://example.com/webhooks/pix".to_string()),
        })
        .unwrap()
    }

    #[test]
    fn test_charge_body_maps_order() {
        let body = gateway().charge_body(&OrderData {
            amount: 28.0,
            description: Some("Frete expresso".to_string()),
            payer_name: Some("Maria".to_string()),
            payer_email: Some("maria@exemplo.com".to_string()),
            payer_document: Some("12345678901".to_string()),
            external_reference: Some("PEDIDO_1000".to_string()),
            customer_id: None,
        });

        assert_eq!(body["transaction_amount"], 28.0);
        assert_eq!(body["payment_method_id"], "pix");
        assert_eq!(body["payer"]["identification"]["number"], "12345678901");
        assert_eq!(body["external_reference"], "PEDIDO_1000");
        assert_eq!(body["notification_url"], "https://example.com/webhooks/pix");
    }

    #[test]
    fn test_charge_body_defaults_for_missing_payer() {
        let body = gateway().charge_body(&OrderData {
            amount: 10.0,
            description: None,
            payer_name: None,
            payer_email: None,
            payer_document: None,
            external_reference: None,
            customer_id: None,
        });

        assert_eq!(body["payer"]["email"], "cliente@exemplo.com");
        assert_eq!(body["payer"]["identification"]["number"], "00000000000");
        assert!(body["external_reference"]
            .as_str()
            .unwrap()
            .starts_with("PEDIDO_"));
    }

    #[test]
    fn test_payment_from_full_response() {
        let payment: MercadoPagoPayment = serde_json::from_value(json!({
            "id": "P1",
            "status": "pending",
            "point_of_interaction": {
                "transaction_data": {
                    "qr_code": "000201...",
                    "qr_code_base64": "iVBOR...",
                }
            },
            "date_of_expiration": "2024-01-01T00:15:00Z",
            "transaction_amount": 28.0,
            "external_reference": "PEDIDO_1000",
        }))
        .unwrap();

        let normalized = payment_from(payment);
        assert_eq!(normalized.id, "P1");
        assert_eq!(normalized.status, "pending");
        assert_eq!(normalized.pix_code.as_deref(), Some("000201..."));
        assert_eq!(normalized.qr_code_base64.as_deref(), Some("iVBOR..."));
        assert_eq!(normalized.expires_at.as_deref(), Some("2024-01-01T00:15:00Z"));
        assert_eq!(normalized.amount, 28.0);
        assert_eq!(normalized.gateway, "mercadopago");
        assert_eq!(normalized.external_reference.as_deref(), Some("PEDIDO_1000"));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            MercadoPagoGateway::error_message(r#"{"message":"invalid token"}"#),
            "invalid token"
        );
        assert_eq!(MercadoPagoGateway::error_message("not json"), "unknown error");
    }
}
