use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    StatusCode,
};
use serde::{Deserialize, Serialize};
use wallet_payment_engine::traits::{ChargeRequest, ChargeSession, GatewayError, PaymentGateway};

use crate::config::GatewayConfig;

/// The default outbound charge client.
///
/// Talks to a Snap-style charge API: one POST per charge, server-key basic auth, and a JSON response carrying the
/// charge token and the redirect URL the buyer completes payment at. The engine guarantees at most one call per
/// fingerprint; this client does no retrying of its own, so a failure here surfaces as a failed attempt the buyer
/// can retry cleanly.
#[derive(Clone)]
pub struct GatewayClient {
    config: GatewayConfig,
    client: Arc<Client>,
}

#[derive(Debug, Serialize)]
struct ChargeBody<'a> {
    order_id: &'a str,
    gross_amount: String,
    payment_method: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    token: String,
    redirect_url: String,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    fn url(&self) -> String {
        format!("{}/charge", self.config.base_url.trim_end_matches('/'))
    }
}

impl PaymentGateway for GatewayClient {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeSession, GatewayError> {
        let body = ChargeBody {
            order_id: request.order_id.as_str(),
            gross_amount: request.amount.to_string(),
            payment_method: &request.payment_method,
        };
        trace!("🌐️ Sending charge request for order {}", request.order_id);
        let response = self
            .client
            .post(self.url())
            .basic_auth(self.config.server_key.reveal(), None::<&str>)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    GatewayError::Network(e.to_string())
                } else {
                    GatewayError::Unavailable(e.to_string())
                }
            })?;
        let status = response.status();
        if status.is_success() {
            let session = response.json::<ChargeResponse>().await.map_err(|e| {
                warn!("🌐️ Gateway returned an unparseable charge response for order {}: {e}", request.order_id);
                GatewayError::InvalidResponse(e.to_string())
            })?;
            debug!("🌐️ Charge session created for order {}", request.order_id);
            Ok(ChargeSession { token: session.token, redirect_url: session.redirect_url })
        } else {
            let message = response.text().await.unwrap_or_default();
            if status == StatusCode::SERVICE_UNAVAILABLE || status.is_server_error() {
                Err(GatewayError::Unavailable(format!("{status}: {message}")))
            } else {
                Err(GatewayError::Rejected(format!("{status}: {message}")))
            }
        }
    }
}
