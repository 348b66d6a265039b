pub mod config;
pub mod crypto;
pub mod domain {
    pub mod callback;
    pub mod payment;
    pub mod transaction;
}
pub mod error;
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod callback;
        pub mod gateways;
        pub mod payments;
        pub mod transactions;
    }
    pub mod middleware {
        pub mod admin_auth;
    }
}
pub mod repo {
    pub mod in_memory;
    pub mod transactions_repo;
}
pub mod resolver;
pub mod service {
    pub mod payment_service;
}

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

#[derive(Clone)]
pub struct AppState {
    pub payment_service: service::payment_service::PaymentService,
}

pub fn router(state: AppState, internal_api_key: String) -> Router {
    let admin_routes = Router::new()
        .route(
            "/transactions/:transaction_id",
            get(http::handlers::transactions::get_transaction),
        )
        .layer(from_fn_with_state(
            internal_api_key,
            http::middleware::admin_auth::require_internal_api_key,
        ));

    Router::new()
        .route("/health", get(http::handlers::payments::health))
        .route("/gateways", get(http::handlers::gateways::list_gateways))
        .route("/payments", post(http::handlers::payments::create_payment))
        .route(
            "/payments/redirect",
            post(http::handlers::payments::redirect_page),
        )
        .route(
            "/callback",
            get(http::handlers::callback::callback_get).post(http::handlers::callback::callback_post),
        )
        .merge(admin_routes)
        .with_state(state)
}
