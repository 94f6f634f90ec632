use bson::oid::ObjectId;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Signing algorithms accepted on validation. Only the HMAC family shares
/// the symmetric secret; anything else in a token header is refused.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,  // Subject (user ID, hex)
    pub exp: i64,    // Expiration time
    #[serde(default)]
    pub iat: i64,    // Issued at
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Bad signature")]
    BadSignature,

    #[error("Unexpected signing algorithm")]
    WrongAlgorithm,

    #[error("Token expired")]
    Expired,

    #[error("Missing or malformed subject claim")]
    MissingSubject,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Issues and checks HS256 identity tokens with a process-wide secret.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject: &ObjectId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            id: subject.to_hex(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Returns the subject of a token that is correctly signed, uses an
    /// accepted algorithm and has not expired at `now`.
    ///
    /// The subject is returned as found in the claim; checking that it is a
    /// well-formed entity id is left to the caller.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(TokenError::WrongAlgorithm);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        // expiry is judged against the caller's clock below, without leeway
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    TokenError::WrongAlgorithm
                }
                // header already parsed, so this is the claims object
                ErrorKind::Json(_) => TokenError::MissingSubject,
                _ => TokenError::Malformed,
            }
        })?;

        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        if data.claims.id.is_empty() {
            return Err(TokenError::MissingSubject);
        }

        Ok(data.claims.id)
    }
}
