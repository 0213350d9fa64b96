// Domain layer - Value objects shared by every screen
pub mod air_quality;
pub mod dashboard;
pub mod error;
pub mod footprint;
pub mod session;
