use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mongodb::Client;

use defiwatch::{
    channels, config, events, routes,
    services::{
        alert_engine::AlertEngine, alert_monitor, clock::SystemClock, db_init,
        mongo_store::MongoAlertStore, snapshot_source::MongoSnapshotSource,
    },
    AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = db_init::ensure_indexes(&db).await {
        tracing::error!(error = %e, "failed to create indexes");
    }

    let engine = AlertEngine::new(
        Arc::new(MongoAlertStore::new(db.clone())),
        Arc::new(MongoSnapshotSource::new(db)),
        channels::from_settings(&settings.channels),
        Arc::new(SystemClock),
        settings.alerts.clone(),
        Duration::from_secs(settings.channels.delivery_timeout_secs),
    );

    let state = AppState {
        settings: settings.clone(),
        engine: Arc::new(engine),
        events_tx: events::channel(),
    };

    alert_monitor::spawn_alert_scanner(state.clone());

    let app = routes::app(state);

    let addr = SocketAddr::from((
        settings
            .host
            .parse::<std::net::IpAddr>()
            .expect("HOST must be an IP address"),
        settings.port,
    ));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
