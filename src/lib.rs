//! Indoor air-quality rating and household carbon-footprint accounting.
//!
//! The pure engines live in [`application::aqi_engine`] and
//! [`application::footprint_engine`]; everything else wires them to
//! reference data, device readings and an HTTP surface.
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
