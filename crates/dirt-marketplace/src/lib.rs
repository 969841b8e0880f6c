//! Marketplace for construction sites trading surplus soil, fill, rock and
//! concrete with nearby sites that need it.

pub mod accounts;
pub mod companies;
pub mod config;
pub mod error;
pub mod geo;
pub mod listings;
pub mod memory;
pub mod repository;
pub mod telemetry;
