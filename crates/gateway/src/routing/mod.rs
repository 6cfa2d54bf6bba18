//! Route configuration for the gateway.

pub mod routes;

pub use routes::create_routes;
