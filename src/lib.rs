//! Library entrypoint for DefiWatch.
//!
//! The alert engine scans reward, position-health, and governance-epoch
//! snapshots, keeps one alert per triggering condition, and delivers open
//! alerts through the configured channels. The HTTP layer on top is thin:
//! listing, acknowledgement, manual scans, and an SSE refresh stream.

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub mod channels;
pub mod services;

pub mod controllers;
pub mod routes;

use std::sync::Arc;

use services::alert_engine::AlertEngine;

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub engine: Arc<AlertEngine>,
    pub events_tx: tokio::sync::broadcast::Sender<String>,
}
