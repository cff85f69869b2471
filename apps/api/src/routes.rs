// [apps/api/src/routes.rs]
/*!
 * APARATO: HTTP ROUTE TABLE (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: ENSAMBLAJE DEL ROUTER
 */

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{billing, invoices};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let billing_routes = Router::new()
        .route("/credits/consume", post(billing::handle_consume))
        .route("/credits/refund", post(billing::handle_refund))
        .route("/credits/balance/:tenant_id", get(billing::handle_get_balance))
        .route("/credits/transactions", get(billing::handle_list_transactions))
        .route("/credits/estimate", post(billing::handle_estimate))
        .route("/invoices/:id/proforma", get(invoices::handle_get_proforma))
        .route("/invoices/:id/proforma/pdf", get(invoices::handle_get_proforma_pdf));

    Router::new()
        .nest("/billing", billing_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
