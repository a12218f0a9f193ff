use async_trait::async_trait;
use serde_json::{json, Value};

use super::{credential, parse_body, PixError, PixGateway};
use crate::models::pix::{
    AsaasCustomer, AsaasPayment, AsaasPixQrCode, GatewayStatusResponse, OrderData,
    PaymentStatusUpdate, PixPayment,
};
use crate::settings::{Environment, GatewayConfig};
use crate::utils;

pub const NAME: &str = "asaas";

const SANDBOX_URL: &str = "https://sandbox.asaas.com/api/v3";
const PRODUCTION_URL: &str = "https://api.asaas.com/v3";

pub struct AsaasGateway {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

pub fn build(config: &GatewayConfig) -> Result<Box<dyn PixGateway>, PixError> {
    Ok(Box::new(AsaasGateway::new(config)?))
}

impl AsaasGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, PixError> {
        let base_url = match config.environment {
            Environment::Sandbox => SANDBOX_URL,
            Environment::Production => PRODUCTION_URL,
        };

        Ok(AsaasGateway {
            base_url: base_url.to_string(),
            api_key: credential(config, NAME, "api_key")?,
            client: reqwest::Client::new(),
        })
    }

    fn payment_body(&self, order: &OrderData, customer_id: &str) -> Value {
        json!({
            "customer": customer_id,
            "billingType": "PIX",
            "value": order.amount,
            "dueDate": utils::expiration_day(15),
            "description": order.description.as_deref().unwrap_or("Pagamento PIX"),
            "externalReference": order
                .external_reference
                .clone()
                .unwrap_or_else(|| format!("PEDIDO_{}", chrono::Utc::now().timestamp_millis())),
        })
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.get("errors")
                    .and_then(|e| e.get(0))
                    .and_then(|e| e.get("description"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "unknown error".to_string())
    }

    async fn create_customer(&self, order: &OrderData) -> Result<String, PixError> {
        let body = json!({
            "name": order.payer_name.as_deref().unwrap_or("Cliente"),
            "email": order.payer_email.as_deref().unwrap_or("cliente@exemplo.com"),
            "cpfCnpj": order.payer_document.as_deref().unwrap_or("00000000000"),
        });

        let response = self
            .client
            .post(format!("{}/customers", self.base_url))
            .header("access_token", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(PixError::Gateway {
                gateway: NAME,
                message: Self::error_message(&text),
            });
        }

        let customer: AsaasCustomer = parse_body(NAME, &text)?;
        Ok(customer.id)
    }

    // A failed QR fetch degrades to a charge without QR fields, it does not
    // fail the creation.
    async fn fetch_qr_code(&self, payment_id: &str) -> Option<AsaasPixQrCode> {
        let response = self
            .client
            .get(format!("{}/payments/{}/pixQrCode", self.base_url, payment_id))
            .header("access_token", &self.api_key)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            log::warn!("asaas: pixQrCode lookup returned {}", response.status());
            return None;
        }

        response.json::<AsaasPixQrCode>().await.ok()
    }
}

fn payment_from(payment: AsaasPayment, qr: Option<AsaasPixQrCode>) -> PixPayment {
    let payload = qr.as_ref().and_then(|q| q.payload.clone());
    let encoded_image = qr.and_then(|q| q.encoded_image);

    PixPayment {
        id: payment.id,
        status: payment.status.to_lowercase(),
        qr_code: payload.clone(),
        qr_code_base64: encoded_image,
        pix_code: payload,
        expires_at: payment.due_date,
        amount: payment.value,
        gateway: NAME.to_string(),
        external_reference: payment.external_reference,
    }
}

#[async_trait]
impl PixGateway for AsaasGateway {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn create_charge(&self, order: &OrderData) -> Result<PixPayment, PixError> {
        let customer_id = match &order.customer_id {
            Some(id) => id.clone(),
            None => self.create_customer(order).await?,
        };

        let response = self
            .client
            .post(format!("{}/payments", self.base_url))
            .header("access_token", &self.api_key)
            .json(&self.payment_body(order, &customer_id))
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

        let payment: AsaasPayment = parse_body(NAME, &body)?;
        let qr = self.fetch_qr_code(&payment.id).await;
        Ok(payment_from(payment, qr))
    }

    async fn get_status(&self, payment_id: &str) -> Result<PaymentStatusUpdate, PixError> {
        let response = self
            .client
            .get(format!("{}/payments/{}", self.base_url, payment_id))
            .header("access_token", &self.api_key)
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
