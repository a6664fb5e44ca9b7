use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, dangerous, decode};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use std::convert::Infallible;
use ts_rs::TS;
use utoipa::ToSchema;

/// Role
///
/// The role claim carried by marketplace tokens. Issuers write it in upper case;
/// lower-case spellings are accepted on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    #[serde(alias = "user")]
    User,
    #[serde(alias = "admin")]
    Admin,
}

/// Credential
///
/// The decoded claims of a bearer token. Built per request from the cookie value and
/// dropped when the request completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Subject (sub): the account identifier assigned by the issuer.
    pub sub: String,
    pub role: Role,
    /// Issued At (iat), Unix seconds.
    #[serde(default, deserialize_with = "unix_seconds")]
    pub iat: i64,
    /// Expiration Time (exp), Unix seconds.
    #[serde(deserialize_with = "unix_seconds")]
    pub exp: i64,
}

impl Credential {
    /// A credential is live only while the current time is strictly before `exp`.
    pub fn is_active(&self, now: i64) -> bool {
        self.exp > now
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Accepts NumericDate claims written as integers or as floats (`1700000000.0`), which
/// some JavaScript issuers emit. Fractions are truncated toward zero.
fn unix_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Whole(i64),
        Fractional(f64),
    }

    match Seconds::deserialize(deserializer)? {
        Seconds::Whole(secs) => Ok(secs),
        Seconds::Fractional(secs) if secs.is_finite() => Ok(secs.trunc() as i64),
        Seconds::Fractional(_) => Err(D::Error::custom("timestamp is not a finite number")),
    }
}

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
const RSA_ALGORITHMS: [Algorithm; 6] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];
const EC_ALGORITHMS: [Algorithm; 2] = [Algorithm::ES256, Algorithm::ES384];

/// SignatureCheck
///
/// How much the validator trusts a presented token.
#[derive(Clone)]
pub enum SignatureCheck {
    /// Signature verified against the issuer's key. `algorithms` is the set the key's
    /// family can verify; a token whose header names anything else is rejected.
    Verify {
        key: DecodingKey,
        algorithms: Vec<Algorithm>,
    },
    /// Header and claims are parsed without building any verifier, whatever algorithm
    /// the header names. Only acceptable when the token was already verified by a
    /// trusted hop in front of the gateway; production configuration refuses it.
    DecodeOnly,
}

/// TokenValidator
///
/// Turns an optional token string into an optional `Credential`. Every failure
/// (missing, malformed, bad signature, unknown role, expired) collapses into `None`.
#[derive(Clone)]
pub struct TokenValidator {
    check: SignatureCheck,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(check: SignatureCheck) -> Self {
        let mut validation = Validation::default();
        // Expiry is compared against the caller's clock in `authenticate`, with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.validate_aud = false;
        // `Credential` enforces the presence of `exp` itself, float seconds included.
        validation.required_spec_claims.clear();
        if let SignatureCheck::Verify { algorithms, .. } = &check {
            validation.algorithms = algorithms.clone();
        }
        Self { check, validation }
    }

    /// Validator for tokens signed with the issuer's shared secret (HS256/384/512).
    pub fn with_secret(secret: &str) -> Self {
        Self::new(SignatureCheck::Verify {
            key: DecodingKey::from_secret(secret.as_bytes()),
            algorithms: HMAC_ALGORITHMS.to_vec(),
        })
    }

    /// Validator for tokens signed with the issuer's private key, given its public key as
    /// PEM. RSA keys accept RS*/PS* tokens, EC keys accept ES256/ES384.
    pub fn with_public_key_pem(pem: &[u8]) -> Result<Self, jsonwebtoken::errors::Error> {
        let check = match DecodingKey::from_rsa_pem(pem) {
            Ok(key) => SignatureCheck::Verify {
                key,
                algorithms: RSA_ALGORITHMS.to_vec(),
            },
            Err(_) => SignatureCheck::Verify {
                key: DecodingKey::from_ec_pem(pem)?,
                algorithms: EC_ALGORITHMS.to_vec(),
            },
        };
        Ok(Self::new(check))
    }

    /// Validator that reads claims without verifying who signed them.
    pub fn decode_only() -> Self {
        Self::new(SignatureCheck::DecodeOnly)
    }

    pub fn verifies_signatures(&self) -> bool {
        matches!(self.check, SignatureCheck::Verify { .. })
    }

    /// Algorithms a token header may name. Empty in decode-only mode, where any is read.
    pub fn algorithms(&self) -> &[Algorithm] {
        match &self.check {
            SignatureCheck::Verify { algorithms, .. } => algorithms,
            SignatureCheck::DecodeOnly => &[],
        }
    }

    /// decode
    ///
    /// Decodes the token's claims. Expiry is not checked here.
    pub fn decode(&self, token: &str) -> Option<Credential> {
        let decoded = match &self.check {
            SignatureCheck::Verify { key, .. } => {
                decode::<Credential>(token, key, &self.validation)
            }
            SignatureCheck::DecodeOnly => dangerous::insecure_decode::<Credential>(token),
        };

        match decoded {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "discarding undecodable access token");
                None
            }
        }
    }

    /// authenticate
    ///
    /// Decodes the token and keeps the credential only if it has not expired at `now`.
    /// Expired tokens are indistinguishable from absent ones.
    pub fn authenticate(&self, token: Option<&str>, now: i64) -> Option<Credential> {
        let token = token.filter(|t| !t.is_empty())?;
        self.decode(token).filter(|credential| credential.is_active(now))
    }
}

/// read_cookie
///
/// Returns the value of the named cookie from the request's `Cookie` headers, if present.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// AuthUser
///
/// The identity the access guard resolved for this request. The guard stores the live
/// `Credential` in the request extensions; this extractor reads it back so handlers
/// never decode tokens themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
    pub expires_at: i64,
}

impl From<&Credential> for AuthUser {
    fn from(credential: &Credential) -> Self {
        AuthUser {
            id: credential.sub.clone(),
            role: credential.role,
            expires_at: credential.exp,
        }
    }
}

/// Rejection: Returns StatusCode::UNAUTHORIZED (401) when the guard attached no credential.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Credential>()
            .map(AuthUser::from)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Credential>().map(AuthUser::from))
    }
}
