// # Token Issuer
//
// Short-lived HS256 bearer tokens for authenticating `url:` fetches.
//
// ## Wire Format
//
// Compact JWS: `base64url(header).base64url(claims).base64url(hmac)`, no
// padding. The header is `{"alg":"HS256","typ":"JWT"}`; the claims are
// serialized in key order:
//
// ```json
// {"exp":1700003600,"lvl":"api","uid":"teamsdns","usr":"teamsdns"}
// ```
//
// The claim names, their values and the one hour lifetime are checked by
// the remote endpoint and must not change.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Value of the `usr` claim
pub const TOKEN_USER: &str = "teamsdns";

/// Value of the `uid` claim
pub const TOKEN_UID: &str = "teamsdns";

/// Value of the `lvl` claim
pub const TOKEN_LEVEL: &str = "api";

/// Token lifetime in seconds
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiry, Unix seconds
    pub exp: i64,
    /// Role
    pub lvl: String,
    /// User id
    pub uid: String,
    /// User name
    pub usr: String,
}

impl TokenClaims {
    /// Claims for a token issued at `now`
    pub fn issued_at(now: DateTime<Utc>) -> Self {
        Self {
            exp: now.timestamp() + TOKEN_LIFETIME_SECS,
            lvl: TOKEN_LEVEL.to_string(),
            uid: TOKEN_UID.to_string(),
            usr: TOKEN_USER.to_string(),
        }
    }
}

/// Issues signed bearer tokens from a configured secret
#[derive(Clone)]
pub struct TokenIssuer {
    secret: Vec<u8>,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer signing with `secret`
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issue a token valid for one hour from now
    pub fn issue(&self) -> Result<String> {
        self.issue_at(Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = serde_json::to_vec(&TokenClaims::issued_at(now))
            .map_err(|e| Error::token(format!("failed to encode claims: {}", e)))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(TOKEN_HEADER),
            URL_SAFE_NO_PAD.encode(claims)
        );

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::token(format!("invalid signing key: {}", e)))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }
}

/// Append `token` as the `token` query parameter of `url`
pub fn append_token(url: &str, token: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", url, separator, token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn split(token: &str) -> (String, String, String) {
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3, "token must have three segments");
        (parts[0].to_string(), parts[1].to_string(), parts[2].to_string())
    }

    #[test]
    fn test_claims_and_expiry() {
        let issuer = TokenIssuer::new("test-secret");
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let token = issuer.issue_at(now).unwrap();
        let (header, payload, _) = split(&token);

        let header = URL_SAFE_NO_PAD.decode(header).unwrap();
        assert_eq!(header, TOKEN_HEADER.as_bytes());

        let payload = URL_SAFE_NO_PAD.decode(payload).unwrap();
        assert_eq!(
            String::from_utf8(payload.clone()).unwrap(),
            r#"{"exp":1700003600,"lvl":"api","uid":"teamsdns","usr":"teamsdns"}"#
        );
        let claims: TokenClaims = serde_json::from_slice(&payload).unwrap();
        assert_eq!(claims.exp, now.timestamp() + 3600);
    }

    #[test]
    fn test_signature_verifies_with_secret() {
        let issuer = TokenIssuer::new("test-secret");
        let token = issuer.issue().unwrap();
        let (header, payload, signature) = split(&token);

        let mut mac = HmacSha256::new_from_slice(b"test-secret").unwrap();
        mac.update(format!("{}.{}", header, payload).as_bytes());
        let signature = URL_SAFE_NO_PAD.decode(signature).unwrap();
        assert!(mac.verify_slice(&signature).is_ok());

        let mut wrong = HmacSha256::new_from_slice(b"other-secret").unwrap();
        wrong.update(format!("{}.{}", header, payload).as_bytes());
        assert!(wrong.verify_slice(&signature).is_err());
    }

    #[test]
    fn test_append_token() {
        assert_eq!(
            append_token("http://example.com/list", "abc"),
            "http://example.com/list?token=abc"
        );
        assert_eq!(
            append_token("http://example.com/list?region=eu", "abc"),
            "http://example.com/list?region=eu&token=abc"
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let issuer = TokenIssuer::new("super-secret");
        assert!(!format!("{:?}", issuer).contains("super-secret"));
    }
}
