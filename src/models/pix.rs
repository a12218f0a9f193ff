use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One checkout attempt's order, as received from the caller. Optional
/// payer fields get safe defaults inside the gateway adapters.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OrderData {
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payer_name: Option<String>,
    #[serde(default)]
    pub payer_email: Option<String>,
    #[serde(default)]
    pub payer_document: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
}

/// Normalized charge across all gateways. The status keeps the active
/// provider's vocabulary, lower-cased.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PixPayment {
    pub id: String,
    pub status: String,
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
    pub pix_code: Option<String>,
    pub expires_at: Option<String>,
    pub amount: f64,
    pub gateway: String,
    pub external_reference: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PaymentStatusUpdate {
    pub status: String,
    pub gateway: String,
}

// Mercado Pago returns payment ids as JSON numbers; normalize to String.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MercadoPagoPayment {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub point_of_interaction: Option<MercadoPagoPointOfInteraction>,
    #[serde(default)]
    pub date_of_expiration: Option<String>,
    pub transaction_amount: f64,
    #[serde(default)]
    pub external_reference: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MercadoPagoPointOfInteraction {
    #[serde(default)]
    pub transaction_data: Option<MercadoPagoTransactionData>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MercadoPagoTransactionData {
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub qr_code_base64: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PagSeguroOrder {
    pub id: String,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub qr_codes: Vec<PagSeguroQrCode>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PagSeguroQrCode {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsaasCustomer {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsaasPayment {
    pub id: String,
    pub status: String,
    pub value: f64,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsaasPixQrCode {
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub encoded_image: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GerencianetCharge {
    pub txid: String,
    pub status: String,
    pub loc: GerencianetLocation,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GerencianetLocation {
    pub id: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GerencianetQrCode {
    #[serde(default)]
    pub qrcode: Option<String>,
    #[serde(rename = "imagemQrcode", default)]
    pub imagem_qrcode: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GerencianetToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Minimal lookup envelope shared by every gateway's status endpoint;
/// unknown fields are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct GatewayStatusResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mercadopago_numeric_id_normalized() {
        let payment: MercadoPagoPayment = serde_json::from_value(serde_json::json!({
            "id": 123456789,
            "status": "pending",
            "transaction_amount": 28.0
        }))
        .unwrap();

        assert_eq!(payment.id, "123456789");
        assert!(payment.point_of_interaction.is_none());
    }

    #[test]
    fn test_asaas_camel_case_fields() {
        let qr: AsaasPixQrCode = serde_json::from_value(serde_json::json!({
            "payload": "000201abc",
            "encodedImage": "iVBORw0"
        }))
        .unwrap();

        assert_eq!(qr.payload.as_deref(), Some("000201abc"));
        assert_eq!(qr.encoded_image.as_deref(), Some("iVBORw0"));
    }

    #[test]
    fn test_gerencianet_qr_rename() {
        let qr: GerencianetQrCode = serde_json::from_value(serde_json::json!({
            "qrcode": "000201def",
            "imagemQrcode": "data:image/png;base64,AAA"
        }))
        .unwrap();

        assert_eq!(qr.imagem_qrcode.as_deref(), Some("data:image/png;base64,AAA"));
    }
}
