use crate::errors::ServiceError;
use crate::services::reconciliation::ReconcileOutcome;
use crate::{ApiResponse, ApiResult, AppState};
use axum::{extract::State, http::HeaderMap};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::{info, warn};
use utoipa::ToSchema;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub success: bool,
    pub outcome: String,
}

// POST /api/v1/payments/webhook
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Webhook accepted", body = WebhookAck),
        (status = 400, description = "Unintelligible payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown transaction reference", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookAck> {
    if let Some(secret) = state.config.payment_webhook_secret.as_deref() {
        let ok = verify_signature(
            &headers,
            &body,
            secret,
            state.config.payment_webhook_tolerance_secs,
        );
        if !ok {
            warn!("payment webhook signature verification failed");
            return Err(ServiceError::Unauthorized(
                "invalid webhook signature".to_string(),
            ));
        }
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::MalformedWebhook(format!("invalid json: {}", e)))?;

    let outcome = state.services.reconciliation.reconcile(&payload).await?;
    let label = match outcome {
        ReconcileOutcome::Applied(status) => format!("applied:{}", status),
        ReconcileOutcome::NoChange => "no_change".to_string(),
        ReconcileOutcome::Ignored => "ignored".to_string(),
    };
    info!(outcome = %label, "payment webhook processed");

    Ok(axum::Json(ApiResponse::success(WebhookAck {
        success: true,
        outcome: label,
    })))
}

/// Generic HMAC scheme over `x-timestamp` and `x-signature` headers. The
/// signed string is `{timestamp}.{raw body}` and the signature is the
/// hex-encoded HMAC-SHA256 digest under the shared secret.
fn verify_signature(headers: &HeaderMap, payload: &Bytes, secret: &str, tolerance_secs: u64) -> bool {
    let (Some(ts), Some(sig)) = (headers.get("x-timestamp"), headers.get("x-signature")) else {
        return false;
    };
    let (Ok(ts), Ok(sig)) = (ts.to_str(), sig.to_str()) else {
        return false;
    };

    if let Ok(ts_i) = ts.parse::<i64>() {
        let now = chrono::Utc::now().timestamp();
        if (now - ts_i).unsigned_abs() > tolerance_secs {
            return false;
        }
    }

    let signed = format!("{}.{}", ts, std::str::from_utf8(payload).unwrap_or(""));
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(signed.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());
    constant_time_eq(&expected, sig)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn sign(secret: &str, ts: i64, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", ts, body).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_passes() {
        let secret = "whsec_test";
        let body = r#"{"id":"T1","status":"PAID"}"#;
        let ts = chrono::Utc::now().timestamp();
        let sig = sign(secret, ts, body);

        let mut headers = HeaderMap::new();
        headers.insert("x-timestamp", HeaderValue::from_str(&ts.to_string()).unwrap());
        headers.insert("x-signature", HeaderValue::from_str(&sig).unwrap());

        assert!(verify_signature(
            &headers,
            &Bytes::from(body.to_owned()),
            secret,
            300
        ));
    }

    #[test]
    fn tampered_body_fails() {
        let secret = "whsec_test";
        let ts = chrono::Utc::now().timestamp();
        let sig = sign(secret, ts, r#"{"id":"T1","status":"PAID"}"#);

        let mut headers = HeaderMap::new();
        headers.insert("x-timestamp", HeaderValue::from_str(&ts.to_string()).unwrap());
        headers.insert("x-signature", HeaderValue::from_str(&sig).unwrap());

        assert!(!verify_signature(
            &headers,
            &Bytes::from_static(br#"{"id":"T1","status":"FAILED"}"#),
            secret,
            300
        ));
    }

    #[test]
    fn stale_timestamp_fails() {
        let secret = "whsec_test";
        let body = r#"{"id":"T1","status":"PAID"}"#;
        let ts = chrono::Utc::now().timestamp() - 3600;
        let sig = sign(secret, ts, body);

        let mut headers = HeaderMap::new();
        headers.insert("x-timestamp", HeaderValue::from_str(&ts.to_string()).unwrap());
        headers.insert("x-signature", HeaderValue::from_str(&sig).unwrap());

        assert!(!verify_signature(
            &headers,
            &Bytes::from(body.to_owned()),
            secret,
            300
        ));
    }

    #[test]
    fn missing_headers_fail() {
        assert!(!verify_signature(
            &HeaderMap::new(),
            &Bytes::from_static(b"{}"),
            "whsec_test",
            300
        ));
    }

    #[test]
    fn constant_time_eq_compares() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
    }
}
