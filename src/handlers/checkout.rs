use crate::entities::product::{self, ShippingOption};
use crate::errors::ServiceError;
use crate::services::bumps::{resolve_bumps, BumpProjection};
use crate::services::checkout::{CheckoutSession, CheckoutStep, CustomerInfo};
use crate::services::payments::{InitiatePayment, PaymentOutcome};
use crate::services::pricing::{compute_totals, TotalsBreakdown};
use crate::{ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/offers/:slug_or_id", get(get_offer))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/customer", put(set_customer))
        .route("/sessions/:id/shipping", put(set_shipping))
        .route("/sessions/:id/bumps/:bump_id/toggle", post(toggle_bump))
        .route("/sessions/:id/step", put(set_step))
        .route("/sessions/:id/pay", post(pay))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price_sale: i64,
    pub price_original: i64,
}

impl From<&product::Model> for ProductSummary {
    fn from(p: &product::Model) -> Self {
        Self {
            id: p.id,
            slug: p.slug.clone(),
            name: p.name.clone(),
            description: p.description.clone(),
            price_sale: p.price_sale,
            price_original: p.price_original,
        }
    }
}

/// Render-ready offer composition for a checkout page.
#[derive(Debug, Serialize, ToSchema)]
pub struct OfferResponse {
    pub product: ProductSummary,
    pub shipping_options: Vec<ShippingOption>,
    pub bumps: Vec<BumpProjection>,
    /// Totals for the default selection (no bumps, first shipping option)
    pub totals: TotalsBreakdown,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Product slug or id
    pub product: String,
}

/// Session snapshot plus live totals for the current selection.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionView {
    pub session: CheckoutSession,
    pub bumps: Vec<BumpProjection>,
    pub totals: TotalsBreakdown,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShippingRequest {
    pub index: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StepRequest {
    /// Funnel step number (1, 2 or 3)
    pub step: u8,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayRequest {
    /// Buyer document, 11 digits
    pub document: String,
    #[serde(default)]
    pub payment_method: Option<String>,
}

async fn project_session(
    state: &AppState,
    session: CheckoutSession,
) -> Result<SessionView, ServiceError> {
    let product = state.services.products.get_by_id(session.product_id).await?;
    let catalog = state.services.products.catalog().await?;
    let bumps = resolve_bumps(&product.order_bumps(), &catalog);
    let totals = compute_totals(&product, &session.selection, &bumps);
    Ok(SessionView {
        session,
        bumps,
        totals,
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/checkout/offers/{slug_or_id}",
    params(("slug_or_id" = String, Path, description = "Product slug or id")),
    responses(
        (status = 200, description = "Offer composition", body = OfferResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn get_offer(
    State(state): State<AppState>,
    Path(slug_or_id): Path<String>,
) -> ApiResult<OfferResponse> {
    let product = state
        .services
        .products
        .get_by_slug_or_id(&slug_or_id)
        .await?;
    let catalog = state.services.products.catalog().await?;
    let bumps = resolve_bumps(&product.order_bumps(), &catalog);
    let totals = compute_totals(&product, &Default::default(), &bumps);

    Ok(Json(ApiResponse::success(OfferResponse {
        product: ProductSummary::from(&product),
        shipping_options: product.shipping_options(),
        bumps,
        totals,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session opened", body = SessionView),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> ApiResult<SessionView> {
    let product = state
        .services
        .products
        .get_by_slug_or_id(&payload.product)
        .await?;
    let session = state.services.checkout.start_session(product.id).await;
    let view = project_session(&state, session).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    get,
    path = "/api/v1/checkout/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session snapshot", body = SessionView),
        (status = 404, description = "Unknown session", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<SessionView> {
    let session = state.services.checkout.get(id)?;
    let view = project_session(&state, session).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    put,
    path = "/api/v1/checkout/sessions/{id}/customer",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = CustomerInfo,
    responses((status = 200, description = "Customer info set", body = SessionView)),
    tag = "Checkout"
)]
pub async fn set_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(customer): Json<CustomerInfo>,
) -> ApiResult<SessionView> {
    let session = state.services.checkout.set_customer_info(id, customer)?;
    let view = project_session(&state, session).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    put,
    path = "/api/v1/checkout/sessions/{id}/shipping",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = ShippingRequest,
    responses((status = 200, description = "Shipping selected", body = SessionView)),
    tag = "Checkout"
)]
pub async fn set_shipping(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShippingRequest>,
) -> ApiResult<SessionView> {
    let session = state.services.checkout.select_shipping(id, payload.index)?;
    let view = project_session(&state, session).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/sessions/{id}/bumps/{bump_id}/toggle",
    params(
        ("id" = Uuid, Path, description = "Session id"),
        ("bump_id" = Uuid, Path, description = "Bump product id")
    ),
    responses((status = 200, description = "Bump toggled", body = SessionView)),
    tag = "Checkout"
)]
pub async fn toggle_bump(
    State(state): State<AppState>,
    Path((id, bump_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<SessionView> {
    let (session, _selected) = state.services.checkout.toggle_bump(id, bump_id)?;
    let view = project_session(&state, session).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    put,
    path = "/api/v1/checkout/sessions/{id}/step",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = StepRequest,
    responses(
        (status = 200, description = "Step changed", body = SessionView),
        (status = 400, description = "Unknown step", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn set_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StepRequest>,
) -> ApiResult<SessionView> {
    let step = CheckoutStep::from_number(payload.step).ok_or_else(|| {
        ServiceError::BadRequest(format!("step must be 1, 2 or 3, got {}", payload.step))
    })?;
    let session = state.services.checkout.goto_step(id, step).await?;
    let view = project_session(&state, session).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/sessions/{id}/pay",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = PayRequest,
    responses(
        (status = 200, description = "Payment intent created", body = PaymentOutcome),
        (status = 400, description = "Invalid buyer data", body = crate::errors::ErrorResponse),
        (status = 502, description = "PSP failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn pay(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PayRequest>,
) -> ApiResult<PaymentOutcome> {
    let session = state.services.checkout.get(id)?;
    if session.customer.name.trim().is_empty() || session.customer.phone.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "buyer name and phone are required before payment".into(),
        ));
    }

    let product = state.services.products.get_by_id(session.product_id).await?;
    let catalog = state.services.products.catalog().await?;
    let bumps = resolve_bumps(&product.order_bumps(), &catalog);
    let totals = compute_totals(&product, &session.selection, &bumps);

    let attribution = [
        session.customer.utm_source.as_deref(),
        session.customer.utm_medium.as_deref(),
        session.customer.utm_campaign.as_deref(),
    ]
    .iter()
    .flatten()
    .copied()
    .collect::<Vec<_>>()
    .join("/");

    let outcome = state
        .services
        .payments
        .initiate(InitiatePayment {
            product_id: product.id,
            product_title: product.name.clone(),
            amount: totals.total,
            description: product.name.clone(),
            customer_name: session.customer.name.clone(),
            customer_phone: session.customer.phone.clone(),
            customer_email: session.customer.email.clone(),
            document: payload.document,
            payment_method: payload.payment_method.unwrap_or_else(|| "pix".to_string()),
            attribution: (!attribution.is_empty()).then_some(attribution),
            session_id: Some(session.id),
            lead_id: session.lead_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(outcome)))
}
