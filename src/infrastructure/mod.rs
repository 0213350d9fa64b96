// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod firebase_repository;
pub mod memory_store;
pub mod static_repository;
