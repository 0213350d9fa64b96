// Application layer - Engines, use cases and collaborator traits
pub mod aqi_engine;
pub mod dashboard_service;
pub mod footprint_engine;
pub mod footprint_service;
pub mod footprint_store;
pub mod query;
pub mod reference_repository;
pub mod sensor_history_service;
