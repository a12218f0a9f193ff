use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{oneshot, watch};
use tokio::time::interval;
use uuid::Uuid;

use super::{RequestHandler, Service, ServiceError};
use crate::models::checkout::{CheckoutStarted, CheckoutState};
use crate::models::pix::OrderData;
use crate::repositories::pix::PixClient;
use crate::settings::Checkout as CheckoutSettings;
use crate::utils;

pub enum CheckoutServiceRequest {
    Start {
        order: OrderData,
        response: oneshot::Sender<Result<CheckoutStarted, ServiceError>>,
    },
    Snapshot {
        checkout_id: String,
        response: oneshot::Sender<Option<CheckoutState>>,
    },
}

enum StatusClass {
    Succeeded,
    Failed,
    InProgress,
    Open,
}

// Union of the four providers' vocabularies; the words are passed through
// to callers untranslated, this only decides the transition.
fn classify_status(status: &str) -> StatusClass {
    match status {
        "approved" | "paid" | "confirmed" | "received" | "concluida" => StatusClass::Succeeded,
        "cancelled" | "canceled" | "expired" | "rejected" | "refunded" | "overdue"
        | "removida_pelo_usuario_recebedor" | "removida_pelo_psp" => StatusClass::Failed,
        "in_process" | "in_mediation" | "processing" => StatusClass::InProgress,
        _ => StatusClass::Open,
    }
}

/// Drives one checkout attempt: creates the charge, then runs the
/// countdown and the status poll until a terminal state. Every state
/// change is published on the watch channel handed out at construction.
pub struct CheckoutController {
    client: Arc<PixClient>,
    expiration: Duration,
    poll_interval: Duration,
    state: watch::Sender<CheckoutState>,
}

impl CheckoutController {
    pub fn new(
        client: Arc<PixClient>,
        expiration: Duration,
        poll_interval: Duration,
    ) -> (Self, watch::Receiver<CheckoutState>) {
        let (state, state_rx) = watch::channel(CheckoutState::Loading);

        (
            CheckoutController {
                client,
                expiration,
                poll_interval,
                state,
            },
            state_rx,
        )
    }

    pub async fn run(self, order: OrderData) {
        let payment = match self.client.create_pix_payment(&order).await {
            Ok(payment) => payment,
            Err(e) => {
                log::error!("Charge creation failed: {}", e);
                let _ = self.state.send(CheckoutState::Error {
                    message: e.to_string(),
                });
                return;
            }
        };

        log::info!("Created {} charge {}.", payment.gateway, payment.id);

        let mut remaining = self.expiration.as_secs();
        let _ = self.state.send(CheckoutState::Pending {
            payment: payment.clone(),
            remaining_secs: remaining,
        });

        let mut countdown = interval(Duration::from_secs(1));
        let mut poll = interval(self.poll_interval);
        // the first tick of an interval fires immediately
        countdown.tick().await;
        poll.tick().await;

        let mut processing = false;

        // One loop owns the state: returning from it drops both intervals
        // in the same tick, and a poll result is always applied by the
        // loop that observed it, so no stale transition can land.
        loop {
            tokio::select! {
                _ = countdown.tick(), if !processing => {
                    remaining = remaining.saturating_sub(1);
                    if remaining == 0 {
                        let _ = self.state.send(CheckoutState::Error {
                            message: "payment window expired".to_string(),
                        });
                        return;
                    }
                    let _ = self.state.send(CheckoutState::Pending {
                        payment: payment.clone(),
                        remaining_secs: remaining,
                    });
                }
                _ = poll.tick() => {
                    let update = match self.client.get_payment_status(&payment.id).await {
                        Ok(update) => update,
                        Err(e) => {
                            log::error!("Status poll failed: {}", e);
                            let _ = self.state.send(CheckoutState::Error {
                                message: e.to_string(),
                            });
                            return;
                        }
                    };

                    match classify_status(&update.status) {
                        StatusClass::Succeeded => {
                            let _ = self.state.send(CheckoutState::Completed {
                                payment: payment.clone(),
                                tracking_code: utils::generate_tracking_code(),
                            });
                            return;
                        }
                        StatusClass::Failed => {
                            let _ = self.state.send(CheckoutState::Error {
                                message: format!("payment {}", update.status),
                            });
                            return;
                        }
                        StatusClass::InProgress => {
                            if !processing {
                                processing = true;
                                let _ = self.state.send(CheckoutState::Processing {
                                    payment: payment.clone(),
                                });
                            }
                        }
                        StatusClass::Open => {}
                    }
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct CheckoutRequestHandler {
    client: Arc<PixClient>,
    expiration: Duration,
    poll_interval: Duration,
    sessions: Arc<DashMap<String, watch::Receiver<CheckoutState>>>,
}

impl CheckoutRequestHandler {
    pub fn new(client: Arc<PixClient>, settings: CheckoutSettings) -> Self {
        CheckoutRequestHandler {
            client,
            expiration: Duration::from_secs(settings.expiration_secs),
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            sessions: Arc::new(DashMap::new()),
        }
    }

    async fn start_checkout(&self, order: OrderData) -> Result<CheckoutStarted, ServiceError> {
        let checkout_id = Uuid::new_v4().hyphenated().to_string();
        let (controller, mut state_rx) =
            CheckoutController::new(self.client.clone(), self.expiration, self.poll_interval);

        // TODO: evict terminal sessions once their payment window lapses.
        self.sessions.insert(checkout_id.clone(), state_rx.clone());
        tokio::spawn(controller.run(order));

        let state = state_rx
            .wait_for(|state| !matches!(state, CheckoutState::Loading))
            .await
            .map_err(|e| {
                ServiceError::Internal(format!("Checkout {} stopped early: {}.", checkout_id, e))
            })?
            .clone();

        match state {
            CheckoutState::Pending { payment, .. }
            | CheckoutState::Processing { payment }
            | CheckoutState::Completed { payment, .. } => Ok(CheckoutStarted {
                checkout_id,
                payment,
            }),
            CheckoutState::Error { message } => {
                Err(ServiceError::Repository("Pix".to_string(), message))
            }
            CheckoutState::Loading => Err(ServiceError::Internal(
                "Checkout never left the loading state.".to_string(),
            )),
        }
    }

    fn snapshot(&self, checkout_id: &str) -> Option<CheckoutState> {
        self.sessions
            .get(checkout_id)
            .map(|state_rx| state_rx.borrow().clone())
    }
}

#[async_trait]
impl RequestHandler<CheckoutServiceRequest> for CheckoutRequestHandler {
    async fn handle_request(&self, request: CheckoutServiceRequest) {
        match request {
            CheckoutServiceRequest::Start { order, response } => {
                let started = self.start_checkout(order).await;
                let _ = response.send(started);
            }
            CheckoutServiceRequest::Snapshot {
                checkout_id,
                response,
            } => {
                let _ = response.send(self.snapshot(&checkout_id));
            }
        }
    }
}

pub struct CheckoutService;

impl CheckoutService {
    pub fn new() -> Self {
        CheckoutService {}
    }
}

#[async_trait]
impl Service<CheckoutServiceRequest, CheckoutRequestHandler> for CheckoutService {}
