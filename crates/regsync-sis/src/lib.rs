//! SIS Client Framework
//!
//! Narrow, capability-based access to the external student information
//! system (SIS). All remote calls are plain request/response JSON over
//! HTTPS with an API key appended as a query parameter; there is no
//! streaming and no long-lived connection.
//!
//! The [`SisClient`] trait is the seam the engine consumes; the
//! [`HttpSisClient`] implementation speaks the wire contract in
//! [`wire`]. Term/campus resolution and CRN lookups go through the
//! [`lookup`] traits, selected at construction via plain dependency
//! injection.

pub mod client;
pub mod config;
pub mod error;
pub mod lookup;
pub mod wire;

// Re-exports for convenience
pub use client::{HttpSisClient, SisClient};
pub use config::SisConfig;
pub use error::{SisError, SisResult};
pub use lookup::{
    DefaultClassLookup, DefaultTermResolver, ExternalClassLookup, ExternalTermResolver,
};
