//! Request identity.
//!
//! An [`IdentityProvider`] turns request headers into a verified external
//! subject id, or nothing. The shipped provider checks HMAC-SHA256 bearer
//! tokens of the form `<base64url(subject)>.<base64url(mac)>`.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const MAX_TOKEN_LEN: usize = 1024;
const SECRET_BYTES: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token secret is empty")]
    EmptySecret,
    #[error("subject is empty")]
    EmptySubject,
    #[error("malformed token")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
}

/// Verifies request headers and yields the caller's external subject id.
pub trait IdentityProvider: Send + Sync {
    /// `None` means "no verified identity"; the resolver decides what that
    /// implies.
    fn subject(&self, headers: &HeaderMap) -> Option<String>;
}

// ---------------------------------------------------------------------------
// TokenVerifier
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct TokenVerifier {
    secret: Vec<u8>,
}

impl TokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::EmptySecret)
    }

    pub fn mint(&self, subject: &str) -> Result<String, TokenError> {
        if subject.trim().is_empty() {
            return Err(TokenError::EmptySubject);
        }
        let subject_part = URL_SAFE_NO_PAD.encode(subject.as_bytes());
        let mut mac = self.mac()?;
        mac.update(subject_part.as_bytes());
        let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{subject_part}.{sig_part}"))
    }

    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::Malformed);
        }
        let (subject_part, sig_part) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_part)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(subject_part.as_bytes());
        mac.verify_slice(&sig).map_err(|_| TokenError::BadSignature)?;

        let raw = URL_SAFE_NO_PAD
            .decode(subject_part)
            .map_err(|_| TokenError::Malformed)?;
        let subject = String::from_utf8(raw).map_err(|_| TokenError::Malformed)?;
        if subject.trim().is_empty() {
            return Err(TokenError::EmptySubject);
        }
        Ok(subject)
    }
}

impl IdentityProvider for TokenVerifier {
    fn subject(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix("Bearer ")?.trim();
        match self.verify(token) {
            Ok(subject) => Some(subject),
            Err(e) => {
                tracing::warn!(error = %e, "rejected bearer token");
                None
            }
        }
    }
}

/// Random hex secret for new config files.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn mint_then_verify() {
        let v = TokenVerifier::new("secret");
        let token = v.mint("ext_123").unwrap();
        assert_eq!(v.verify(&token).unwrap(), "ext_123");
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = TokenVerifier::new("secret").mint("ext_123").unwrap();
        assert_eq!(
            TokenVerifier::new("other").verify(&token),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn tampered_subject_is_rejected() {
        let v = TokenVerifier::new("secret");
        let token = v.mint("ext_123").unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let forged = format!("{}.{sig}", URL_SAFE_NO_PAD.encode("admin"));
        assert_eq!(v.verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn malformed_and_empty_inputs() {
        let v = TokenVerifier::new("secret");
        assert_eq!(v.verify("no-dot"), Err(TokenError::Malformed));
        assert_eq!(v.verify("abc.!!!"), Err(TokenError::Malformed));
        assert_eq!(v.mint("  "), Err(TokenError::EmptySubject));
        assert_eq!(TokenVerifier::new("").mint("x"), Err(TokenError::EmptySecret));
    }

    #[test]
    fn provider_reads_bearer_header() {
        let v = TokenVerifier::new("secret");
        let token = v.mint("ext_9").unwrap();
        assert_eq!(v.subject(&headers(&format!("Bearer {token}"))).as_deref(), Some("ext_9"));
        assert_eq!(v.subject(&headers(&format!("Basic {token}"))), None);
        assert_eq!(v.subject(&headers("Bearer junk")), None);
        assert_eq!(v.subject(&HeaderMap::new()), None);
    }

    #[test]
    fn generated_secrets_differ() {
        let a = generate_secret();
        assert_eq!(a.len(), SECRET_BYTES * 2);
        assert_ne!(a, generate_secret());
    }
}
