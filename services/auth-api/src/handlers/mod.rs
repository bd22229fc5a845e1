//! HTTP handlers

mod auth;
mod health;

pub use auth::{login, logout, me, refresh, LoginForm, MeResponse};
pub use health::{health, ready, CheckResult, HealthResponse, ReadyResponse};
