use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::{PixError, PixGateway};
use crate::models::pix::{OrderData, PaymentStatusUpdate, PixPayment};

pub const NAME: &str = "mock";

/// Scripted gateway for controller tests: charge creation either succeeds
/// or fails, and each status poll pops the next status from the script
/// (the last entry repeats).
pub struct MockGateway {
    pub fail_create: bool,
    pub statuses: Vec<&'static str>,
    pub polls: Arc<AtomicUsize>,
}

impl MockGateway {
    pub fn with_statuses(statuses: Vec<&'static str>) -> Self {
        MockGateway {
            fail_create: false,
            statuses,
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_create() -> Self {
        MockGateway {
            fail_create: true,
            statuses: Vec::new(),
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl PixGateway for MockGateway {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn create_charge(&self, order: &OrderData) -> Result<PixPayment, PixError> {
        if self.fail_create {
            return Err(PixError::Gateway {
                gateway: NAME,
                message: "mock decline".to_string(),
            });
        }

        Ok(PixPayment {
            id: "mock_charge_1".to_string(),
            status: "pending".to_string(),
            qr_code: Some("000201mock".to_string()),
            qr_code_base64: Some("iVBORmock".to_string()),
            pix_code: Some("000201mock".to_string()),
            expires_at: None,
            amount: order.amount,
            gateway: NAME.to_string(),
            external_reference: order.external_reference.clone(),
        })
    }

    async fn get_status(&self, _payment_id: &str) -> Result<PaymentStatusUpdate, PixError> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst);
        let status = match self.statuses.get(poll) {
            Some(status) => status,
            None => match self.statuses.last() {
                Some(status) => status,
                None => {
                    return Err(PixError::Gateway {
                        gateway: NAME,
                        message: "mock status failure".to_string(),
                    })
                }
            },
        };

        Ok(PaymentStatusUpdate {
            status: status.to_string(),
            gateway: NAME.to_string(),
        })
    }
}
