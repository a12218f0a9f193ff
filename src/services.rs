use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::repositories::pix::PixClient;
use crate::settings::Settings;

mod checkout;
mod http;

#[derive(Debug, thiserror::Error)]
enum ServiceError {
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Repository error: {0} - {1}")]
    Repository(String, String),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(settings: Settings) -> Result<(), anyhow::Error> {
    let client = Arc::new(PixClient::new(&settings.gateway)?);
    log::info!("Resolved gateway adapter: {}.", client.gateway_name());

    let (checkout_tx, mut checkout_rx) = mpsc::channel(512);

    println!("[*] Starting checkout service.");
    let mut checkout_service = checkout::CheckoutService::new();
    let checkout_settings = settings.checkout.clone();
    tokio::spawn(async move {
        checkout_service
            .run(
                checkout::CheckoutRequestHandler::new(client, checkout_settings),
                &mut checkout_rx,
            )
            .await;
    });

    println!("[*] Starting HTTP server.");
    http::start_http_server(&settings.server.listen, checkout_tx).await?;

    Ok(())
}
