//! PostgreSQL repository implementations

mod principal;

pub use principal::PgPrincipalRepository;
