//! Signing and verification of access/refresh tokens
//!
//! Tokens are JWTs signed with an asymmetric key. Only the algorithms in
//! [`ALLOWED_ALGORITHMS`] are accepted; a token whose header names any other
//! algorithm (including every HMAC variant) is rejected before its signature
//! is looked at.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use keygate_types::TokenKind;
use serde::{Deserialize, Serialize};

use crate::{AuthConfig, AuthError};

/// Asymmetric algorithms a codec may be configured with
pub const ALLOWED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::EdDSA,
];

/// Claims chosen by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Principal id as a string
    pub sub: String,
    pub token_type: TokenKind,
}

impl Claims {
    pub fn new(sub: impl Into<String>, token_type: TokenKind) -> Self {
        Self {
            sub: sub.into(),
            token_type,
        }
    }
}

/// Claims as they appear on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub token_type: TokenKind,
    /// Expiration timestamp (unix seconds)
    pub exp: i64,
    pub aud: String,
}

impl TokenClaims {
    /// Seconds until expiry, zero once expired
    pub fn remaining_secs(&self) -> u64 {
        u64::try_from(self.exp - Utc::now().timestamp()).unwrap_or(0)
    }
}

/// Whether `algorithm` may sign or verify tokens
pub fn is_allowed(algorithm: Algorithm) -> bool {
    ALLOWED_ALGORITHMS.contains(&algorithm)
}

/// Sign `claims` with `exp = now + ttl` and `aud = audience`
pub fn issue(
    claims: &Claims,
    key: &EncodingKey,
    audience: &str,
    ttl: Duration,
    algorithm: Algorithm,
) -> Result<String, AuthError> {
    if !is_allowed(algorithm) {
        return Err(AuthError::Configuration(format!(
            "algorithm {:?} is not allowed",
            algorithm
        )));
    }

    let ttl = i64::try_from(ttl.as_secs())
        .map_err(|_| AuthError::Configuration("token lifetime out of range".to_string()))?;
    let payload = TokenClaims {
        sub: claims.sub.clone(),
        token_type: claims.token_type,
        exp: Utc::now().timestamp().saturating_add(ttl),
        aud: audience.to_string(),
    };

    encode(&Header::new(algorithm), &payload, key).map_err(|e| {
        tracing::error!("Failed to sign token: {}", e);
        AuthError::Internal("failed to sign token".to_string())
    })
}

/// Verify signature, audience and expiry of `token`.
///
/// The header's algorithm must be one of `algorithms` and of the allow-list.
pub fn verify(
    token: &str,
    key: &DecodingKey,
    audience: &str,
    algorithms: &[Algorithm],
) -> Result<TokenClaims, AuthError> {
    let header = decode_header(token).map_err(|e| {
        tracing::debug!("Failed to decode token header: {}", e);
        AuthError::SignatureInvalid
    })?;

    if !is_allowed(header.alg) || !algorithms.contains(&header.alg) {
        tracing::debug!(alg = ?header.alg, "Token algorithm not accepted");
        return Err(AuthError::SignatureInvalid);
    }

    let mut validation = Validation::new(header.alg);
    validation.leeway = 0;
    validation.set_audience(&[audience]);
    validation.set_required_spec_claims(&["exp", "aud", "sub"]);

    let claims = decode::<TokenClaims>(token, key, &validation)
        .map_err(|e| {
            tracing::debug!("Token validation failed: {}", e);
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidAudience
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::Json(_) => AuthError::ClaimMismatch,
                _ => AuthError::SignatureInvalid,
            }
        })?
        .claims;

    // jsonwebtoken accepts exp == now
    if claims.exp <= Utc::now().timestamp() {
        return Err(AuthError::Expired);
    }

    Ok(claims)
}

/// Load a signing key in the PEM family of `algorithm`
pub fn encoding_key_from_pem(pem: &[u8], algorithm: Algorithm) -> Result<EncodingKey, AuthError> {
    let key = match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => EncodingKey::from_rsa_pem(pem),
        Algorithm::ES256 | Algorithm::ES384 => EncodingKey::from_ec_pem(pem),
        Algorithm::EdDSA => EncodingKey::from_ed_pem(pem),
        other => {
            return Err(AuthError::Configuration(format!(
                "algorithm {:?} is not allowed",
                other
            )))
        }
    };
    key.map_err(|e| AuthError::Configuration(format!("invalid private key: {}", e)))
}

/// Load a verification key in the PEM family of `algorithm`
pub fn decoding_key_from_pem(pem: &[u8], algorithm: Algorithm) -> Result<DecodingKey, AuthError> {
    let key = match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
        other => {
            return Err(AuthError::Configuration(format!(
                "algorithm {:?} is not allowed",
                other
            )))
        }
    };
    key.map_err(|e| AuthError::Configuration(format!("invalid public key: {}", e)))
}

/// Key pair, algorithm and audience bound together
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    audience: String,
}

impl TokenCodec {
    /// Create a codec from loaded keys
    pub fn new(
        encoding_key: EncodingKey,
        decoding_key: DecodingKey,
        algorithm: Algorithm,
        audience: impl Into<String>,
    ) -> Result<Self, AuthError> {
        if !is_allowed(algorithm) {
            return Err(AuthError::Configuration(format!(
                "algorithm {:?} is not allowed",
                algorithm
            )));
        }
        Ok(Self {
            encoding_key,
            decoding_key,
            algorithm,
            audience: audience.into(),
        })
    }

    /// Load keys from the PEM strings in `config`
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let encoding_key = encoding_key_from_pem(config.private_key_pem.as_bytes(), config.algorithm)?;
        let decoding_key = decoding_key_from_pem(config.public_key_pem.as_bytes(), config.algorithm)?;
        Self::new(encoding_key, decoding_key, config.algorithm, config.audience.clone())
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn issue(&self, claims: &Claims, ttl: Duration) -> Result<String, AuthError> {
        issue(claims, &self.encoding_key, &self.audience, ttl, self.algorithm)
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        verify(token, &self.decoding_key, &self.audience, &[self.algorithm])
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}
