use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PIX Checkout API",
        version = "1.0.0",
        description = r#"
# PIX Checkout API

Per-item checkout funnel with PIX settlement.

## Features

- **Offer Composition**: Product, shipping options and order bumps with computed totals
- **Checkout Sessions**: Three-step funnel (identification, fulfillment, settlement) with abandoned-lead capture
- **Payment Initiation**: PIX charge creation against the configured PSP
- **Settlement Webhooks**: Idempotent reconciliation of asynchronous PSP status deliveries

## Error Handling

The API uses a consistent error response format with appropriate HTTP status codes:

```json
{
  "error": "Bad Request",
  "message": "Validation failed",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "Checkout", description = "Offer and checkout session endpoints"),
        (name = "Payments", description = "Payment settlement endpoints")
    ),
    paths(
        crate::handlers::checkout::get_offer,
        crate::handlers::checkout::create_session,
        crate::handlers::checkout::get_session,
        crate::handlers::checkout::set_customer,
        crate::handlers::checkout::set_shipping,
        crate::handlers::checkout::toggle_bump,
        crate::handlers::checkout::set_step,
        crate::handlers::checkout::pay,
        crate::handlers::webhooks::payment_webhook,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,

            crate::handlers::checkout::OfferResponse,
            crate::handlers::checkout::ProductSummary,
            crate::handlers::checkout::CreateSessionRequest,
            crate::handlers::checkout::SessionView,
            crate::handlers::checkout::ShippingRequest,
            crate::handlers::checkout::StepRequest,
            crate::handlers::checkout::PayRequest,
            crate::handlers::webhooks::WebhookAck,

            crate::services::checkout::CheckoutStep,
            crate::services::checkout::CustomerInfo,
            crate::services::checkout::CheckoutSession,
            crate::services::pricing::SelectionState,
            crate::services::pricing::TotalsBreakdown,
            crate::services::bumps::BumpProjection,
            crate::services::payments::PaymentOutcome,
            crate::entities::product::ShippingOption,
            crate::entities::transaction::TransactionStatus,

            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn openapi_routes<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("PIX Checkout API"));
        assert!(json.contains("/api/v1/checkout/sessions"));
        assert!(json.contains("/api/v1/payments/webhook"));
    }
}
