//! The Pi marketplace payment gateway server.
//!
//! A thin `actix-web` surface over [`pi_market_engine`]: four payment-event endpoints (approve, complete,
//! incomplete, cancelled), checkout, and a health probe. All protocol decisions live in the engine; the server
//! only authenticates callers, deserializes payloads and maps errors onto HTTP status codes.
//!
//! Authentication is split by caller:
//! * User-initiated calls (approve, checkout) trust the `X-Forwarded-User` header installed by the session layer
//!   in front of this service.
//! * Platform callbacks (complete, incomplete, cancelled) are verified with an HMAC-SHA256 signature over the raw
//!   request body, carried in the `X-Pi-Signature` header.
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod routes;
pub mod server;
