use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use pix_checkout_api::{
    config::AppConfig,
    db,
    entities::product,
    events::{self, EventSender},
    gateway::{pix::PixGateway, PaymentGateway},
    handlers::AppServices,
    AppState,
};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up an application backed by an in-memory
/// SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Construct a test application, adjusting the configuration before
    /// services are wired (PSP endpoint, webhook secret, ...).
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.psp_api_key = Some("test_psp_key".to_string());
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let gateway: Arc<dyn PaymentGateway> = Arc::new(PixGateway::from_config(&cfg));
        let services = AppServices::new(db_arc.clone(), event_sender.clone(), gateway);

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", pix_checkout_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Insert a catalog product and return its model.
    pub async fn seed_product(
        &self,
        slug: &str,
        price_sale: i64,
        shipping_options: Value,
        order_bumps: Value,
    ) -> product::Model {
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            slug: Set(slug.to_string()),
            name: Set(format!("Product {}", slug)),
            description: Set(None),
            price_sale: Set(price_sale),
            price_original: Set(price_sale + 10_000),
            shipping_options: Set(shipping_options),
            order_bumps: Set(order_bumps),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        model
            .insert(&*self.state.db)
            .await
            .expect("failed to seed product")
    }

    /// Send a JSON request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    /// Send a JSON request with extra headers.
    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

/// Collect a response body as JSON.
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
