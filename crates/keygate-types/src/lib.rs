//! Keygate Types - Shared domain types
//!
//! This crate contains domain types used across Keygate crates:
//! - Principal identity and account flags
//! - Token kinds and the bearer response body
//! - Policy denial reasons

pub mod error;
pub mod principal;
pub mod token;

pub use error::*;
pub use principal::*;
pub use token::*;
