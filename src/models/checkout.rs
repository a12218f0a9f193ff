use serde::Serialize;

use crate::models::pix::PixPayment;

/// Checkout lifecycle. `Completed` and `Error` are terminal; a retry is a
/// brand new checkout starting over from `Loading`.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    Loading,
    Pending {
        payment: PixPayment,
        remaining_secs: u64,
    },
    Processing {
        payment: PixPayment,
    },
    Completed {
        payment: PixPayment,
        tracking_code: String,
    },
    Error {
        message: String,
    },
}

impl CheckoutState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Completed { .. } | CheckoutState::Error { .. })
    }
}

/// Response to a successfully started checkout.
#[derive(Clone, Debug, Serialize)]
pub struct CheckoutStarted {
    pub checkout_id: String,
    pub payment: PixPayment,
}
