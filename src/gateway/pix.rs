//! PIX instant-transfer gateway implementation. Owns request shaping,
//! response parsing and error classification for the active PSP.

use super::{GatewayIntent, PaymentGateway, PaymentRequest};
use crate::config::AppConfig;
use crate::entities::transaction::TransactionStatus;
use crate::errors::ServiceError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{instrument, warn};

const GATEWAY_NAME: &str = "pix";

#[derive(Clone)]
pub struct PixGateway {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    minimum_amount: i64,
}

impl PixGateway {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        minimum_amount: i64,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            http,
            endpoint,
            api_key,
            minimum_amount,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.psp_endpoint.clone(),
            cfg.psp_api_key.clone(),
            cfg.psp_minimum_amount,
            Duration::from_secs(cfg.gateway_timeout_secs),
        )
    }

    fn credential(&self) -> Result<&str, ServiceError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ServiceError::GatewayError("payment gateway credential is not configured".into())
            })
    }

    fn shape_body(request: &PaymentRequest) -> Value {
        json!({
            "value": request.amount,
            "description": request.description,
            "reference_id": request.reference,
            "customer": {
                "name": request.buyer.name,
                "document": request.buyer.document,
                "email": request.buyer.email,
                "phone": request.buyer.phone,
            },
            "item": {
                "title": request.line_item.title,
                "price": request.line_item.price,
                "quantity": request.line_item.quantity,
            },
            "metadata": {
                "attribution": request.attribution,
            },
        })
    }

    fn extract_token(body: &Value) -> Option<String> {
        ["pix_code", "pixCode", "qr_code", "qrCode"]
            .iter()
            .find_map(|key| body.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn extract_provider_id(body: &Value) -> Option<String> {
        ["transactionId", "transaction_id", "id"]
            .iter()
            .find_map(|key| body.get(key))
            .and_then(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }
}

#[async_trait]
impl PaymentGateway for PixGateway {
    #[instrument(skip(self, request), fields(reference = %request.reference, amount = request.amount))]
    async fn initiate(&self, request: &PaymentRequest) -> Result<GatewayIntent, ServiceError> {
        let api_key = self.credential()?;

        if request.amount < self.minimum_amount {
            return Err(ServiceError::ValidationError(format!(
                "amount {} is below the PSP minimum of {}",
                request.amount, self.minimum_amount
            )));
        }

        if self.endpoint.is_empty() {
            return Err(ServiceError::GatewayError(
                "payment gateway endpoint is not configured".into(),
            ));
        }

        let body = Self::shape_body(request);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("PSP unreachable: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("failed reading PSP response: {}", e)))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "PSP returned non-success status");
            return Err(ServiceError::GatewayError(format!(
                "PSP returned status {}",
                status.as_u16()
            )));
        }

        if text.trim().is_empty() {
            return Err(ServiceError::GatewayError("PSP returned an empty body".into()));
        }

        let parsed: Value = serde_json::from_str(&text)
            .map_err(|e| ServiceError::GatewayError(format!("unparsable PSP response: {}", e)))?;

        // A 200 without a payment token is still a failure: there is
        // nothing for the buyer to pay.
        let pix_code = Self::extract_token(&parsed).ok_or_else(|| {
            ServiceError::GatewayError("PSP response did not include a payment token".into())
        })?;

        let provider_transaction_id =
            Self::extract_provider_id(&parsed).unwrap_or_else(|| request.reference.to_string());

        Ok(GatewayIntent {
            provider_transaction_id,
            pix_code,
            status: TransactionStatus::Pending,
        })
    }

    fn name(&self) -> &str {
        GATEWAY_NAME
    }
}
