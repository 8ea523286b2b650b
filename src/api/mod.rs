//! API Module
//!
//! Admin HTTP surface over a shared cache store of JSON values.
//!
//! # Endpoints
//! - `PUT /entries` - Store an entry with optional TTL and tags
//! - `GET /entries/:key` - Read an entry and its metadata
//! - `DELETE /entries/:key` - Invalidate one key
//! - `POST /invalidate/pattern` - Invalidate keys containing a substring
//! - `POST /invalidate/tags` - Invalidate entries carrying any of the tags
//! - `POST /clear` - Remove every entry
//! - `GET /stats` - Statistics snapshot
//! - `POST /stats/reset` - Zero the counters
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
