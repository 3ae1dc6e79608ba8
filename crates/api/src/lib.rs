//! HTTP API: server, routing, and request/response mapping for the pantry.

pub mod app;
pub mod middleware;
