//! Keygate Auth Core - Dual-token authentication
//!
//! Short-lived access tokens and long-lived refresh tokens, signed with an
//! asymmetric key, checked against a revocation store on every read.
//!
//! - [`TokenCodec`]: sign and verify tokens (allow-listed algorithms only)
//! - [`TokenStrategy`]: issue credential pairs, validate tokens, revoke on logout
//! - [`Resolver`]: apply an [`AuthPolicy`] to the credentials of a request
//!
//! # Example
//!
//! ```rust,ignore
//! use keygate_auth_core::{AuthConfig, AuthPolicy, Credentials, Resolver, TokenStrategy};
//!
//! let config = AuthConfig::from_pem_files("keys/private.pem", "keys/public.pem")?;
//! let strategy = TokenStrategy::from_config(&config, principals, revocations)?;
//!
//! let pair = strategy.login(&principal, false)?;
//! let resolver = Resolver::new(AuthPolicy::default());
//! let credentials = Credentials { access: Some(pair.access.token), refresh: None };
//! let authenticated = resolver.resolve(&strategy, &credentials).await?;
//! ```

pub mod authenticator;
pub mod codec;
pub mod config;
pub mod error;
pub mod password;
pub mod strategy;

pub use authenticator::{AuthPolicy, CredentialFields, Credentials, Resolver};
pub use codec::{Claims, TokenClaims, TokenCodec, ALLOWED_ALGORITHMS};
pub use config::{AuthConfig, DEFAULT_AUDIENCE};
pub use error::AuthError;
pub use jsonwebtoken::Algorithm;
pub use password::{hash_password, verify_password};
pub use strategy::{AuthenticatedToken, IssuedToken, TokenOutcome, TokenPair, TokenStrategy};
