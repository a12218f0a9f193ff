use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

use super::checkout::CheckoutServiceRequest;
use crate::models::pix::OrderData;

#[derive(Clone)]
struct AppState {
    checkout_channel: mpsc::Sender<CheckoutServiceRequest>,
}

async fn start_checkout(
    State(state): State<AppState>,
    Json(order): Json<OrderData>,
) -> impl IntoResponse {
    if order.amount <= 0.0 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"description": "Amount must be greater than zero."})),
        );
    }

    let (checkout_tx, checkout_rx) = oneshot::channel();

    let send_result = state
        .checkout_channel
        .send(CheckoutServiceRequest::Start {
            order,
            response: checkout_tx,
        })
        .await;

    if let Err(e) = send_result {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to process request: {}", e)})),
        );
    }

    match checkout_rx.await {
        Ok(Ok(started)) => (StatusCode::CREATED, Json(json!(started))),
        Ok(Err(service_error)) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({"description": service_error.to_string()})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to receive response: {}", e)})),
        ),
    }
}

async fn get_checkout(
    State(state): State<AppState>,
    Path(checkout_id): Path<String>,
) -> impl IntoResponse {
    let (snapshot_tx, snapshot_rx) = oneshot::channel();

    let send_result = state
        .checkout_channel
        .send(CheckoutServiceRequest::Snapshot {
            checkout_id,
            response: snapshot_tx,
        })
        .await;

    if let Err(e) = send_result {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to process request: {}", e)})),
        );
    }

    match snapshot_rx.await {
        Ok(Some(snapshot)) => (StatusCode::OK, Json(json!(snapshot))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"description": "Checkout not found."})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to receive response: {}", e)})),
        ),
    }
}

pub async fn start_http_server(
    listen: &str,
    checkout_channel: mpsc::Sender<CheckoutServiceRequest>,
) -> Result<(), anyhow::Error> {
    let app_state = AppState { checkout_channel };

    let app = Router::new()
        .route("/checkout", post(start_checkout))
        .route("/checkout/{id}", get(get_checkout))
        .route("/health", get(|| async { "OK" }))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(listen).await?;
    println!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
