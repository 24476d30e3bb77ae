//! HTTP variant: one browser session per caller-chosen session id.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod sessions;
pub mod types;
