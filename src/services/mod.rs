pub mod clock;
pub mod evaluators;

pub mod alert_store;
pub mod memory_store;
pub mod mongo_store;
pub mod snapshot_source;
pub mod db_init;

pub mod reconciler;
pub mod dispatcher;
pub mod alert_engine;
pub mod alert_monitor;

pub mod alerts_service;
