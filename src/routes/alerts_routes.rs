use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::alerts_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/alerts", get(alerts_controller::get_alerts))
        .route("/api/alerts/:id/deliveries", get(alerts_controller::get_alert_deliveries))
        .route("/api/alerts/:id/ack", post(alerts_controller::post_ack_alert))
        .route("/api/scan", post(alerts_controller::post_run_scan))
}
