//! Gateway: webhook HTTP server.
//!
//! Single port serves a health probe and the LINE webhook. Each webhook event is
//! dispatched and, when it has a reply, answered through the LINE reply API.

mod server;

pub use server::run_gateway;
