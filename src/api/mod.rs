//! API Module
//!
//! HTTP handlers and routing for the quote server.
//!
//! # Endpoints
//! - `GET /?input=&output=&amount=` - Exchange quote between two tokens
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
