//! # Auth Gateway
//!
//! HTTP surface for Sign-In with Ethereum.
//!
//! ## Endpoints
//!
//! | Method | Path | Success | Failure |
//! |---|---|---|---|
//! | GET | `/nonce` | 200 `{"data":{"nonce"}}` + session cookie | 503 |
//! | POST | `/verify` | 204 | 400 bad body, 422 rejected, 503 store down |
//! | GET | `/health` | 200 `{"status":"ok"}` | |
//!
//! The nonce a client must sign is remembered server-side against a random
//! session id carried in an `HttpOnly; SameSite=Strict` cookie.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod session;

pub use config::{ConfigError, GatewayConfig};
pub use error::ApiError;
pub use routes::{router, AppState, VerifyRequest};
pub use server::{AuthGateway, GatewayError};
pub use session::{SessionCookie, SessionRegistry};
