use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("signature does not match")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("malformed token")]
    Malformed,

    #[error("claims carry no expiry")]
    MissingExpiry,

    #[error("signing failed: {0}")]
    Signing(String),
}

/// HS256 signer/verifier for compact claim sets carrying an absolute `exp`.
/// Built once from the configured secret and shared by every caller; it does
/// not look at claim shape or type.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// With `ttl`, stamps `iat` (unless present) and `exp = now + ttl`.
    /// Without it, `claims` must already carry an absolute `exp`.
    pub fn sign<C: Serialize>(&self, claims: &C, ttl: Option<Duration>) -> Result<String, TokenError> {
        let mut value = serde_json::to_value(claims).map_err(|_| TokenError::Malformed)?;
        let obj = value.as_object_mut().ok_or(TokenError::Malformed)?;

        match ttl {
            Some(ttl) => {
                let now = Utc::now().timestamp();
                obj.entry("iat").or_insert(json!(now));
                obj.insert("exp".into(), json!(now + ttl.num_seconds()));
            }
            None => {
                if !obj.get("exp").is_some_and(Value::is_i64) {
                    return Err(TokenError::MissingExpiry);
                }
            }
        }

        encode(&Header::new(Algorithm::HS256), &value, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        decode::<C>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Absolute {
        name: String,
        exp: i64,
    }

    fn sample() -> Sample {
        Sample { name: "acme".into(), count: 3 }
    }

    #[test]
    fn test_round_trip_with_ttl() {
        let codec = TokenCodec::new("secret");
        let token = codec.sign(&sample(), Some(Duration::hours(1))).unwrap();
        let back: Sample = codec.verify(&token).unwrap();
        assert_eq!(back, sample());

        let raw: Value = codec.verify(&token).unwrap();
        let iat = raw["iat"].as_i64().unwrap();
        assert_eq!(raw["exp"].as_i64().unwrap() - iat, 3600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = TokenCodec::new("secret").sign(&sample(), Some(Duration::hours(1))).unwrap();
        let err = TokenCodec::new("other").verify::<Sample>(&token).unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[test]
    fn test_past_expiry_is_rejected() {
        let codec = TokenCodec::new("secret");
        let claims = Absolute {
            name: "old".into(),
            exp: Utc::now().timestamp() - 5,
        };
        let token = codec.sign(&claims, None).unwrap();
        assert_eq!(codec.verify::<Value>(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_absolute_expiry_is_kept() {
        let codec = TokenCodec::new("secret");
        let exp = Utc::now().timestamp() + 7 * 24 * 3600;
        let token = codec.sign(&Absolute { name: "inv".into(), exp }, None).unwrap();
        let back: Absolute = codec.verify(&token).unwrap();
        assert_eq!(back.exp, exp);
    }

    #[test]
    fn test_missing_expiry_is_refused() {
        let codec = TokenCodec::new("secret");
        assert_eq!(codec.sign(&sample(), None).unwrap_err(), TokenError::MissingExpiry);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = TokenCodec::new("secret");
        assert_eq!(codec.verify::<Value>("not-a-token").unwrap_err(), TokenError::Malformed);
        assert_eq!(codec.verify::<Value>("").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let codec = TokenCodec::new("secret");
        let token = codec.sign(&sample(), Some(Duration::hours(1))).unwrap();
        let other = codec
            .sign(&Sample { name: "globex".into(), count: 3 }, Some(Duration::hours(1)))
            .unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
        assert_eq!(codec.verify::<Sample>(&forged).unwrap_err(), TokenError::InvalidSignature);
    }
}
