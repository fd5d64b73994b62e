//! HTTP surface

pub mod health;
pub mod intake;

pub use health::health_routes;
pub use intake::intake_routes;
