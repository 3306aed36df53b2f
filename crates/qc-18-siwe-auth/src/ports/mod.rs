//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API that login front ends use
//! - **Outbound (Driven)**: The nonce store this subsystem needs

pub mod inbound;
pub mod outbound;
