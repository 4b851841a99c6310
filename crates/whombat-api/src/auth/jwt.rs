//! Bearer token verification against the identity provider's JWKS.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (via `common::jwt`)
//! - Only RS256 is accepted; the header's `alg` is checked before any key
//!   lookup so `none`/HMAC tokens are rejected as algorithm confusion
//! - Signature, `exp`, `iss` and `aud` are checked by `jsonwebtoken` with
//!   its default leeway
//! - Reasons returned to the caller never include token contents

use crate::auth::claims::TokenClaims;
use crate::auth::jwks::{Jwk, JwksClient};
use crate::auth::AuthError;
use common::jwt::parse_header;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tracing::instrument;

/// The only signing algorithm the provider uses for access tokens.
const EXPECTED_ALGORITHM: &str = "RS256";

/// Verifies bearer tokens and returns their claims.
pub struct TokenVerifier {
    jwks_client: Arc<JwksClient>,
    expected_issuer: String,
    audience: String,
}

impl TokenVerifier {
    /// Create a verifier.
    ///
    /// # Arguments
    ///
    /// * `jwks_client` - Key Material Cache for the provider's signing keys
    /// * `expected_issuer` - Tenant issuer URI the `iss` claim must equal
    /// * `audience` - Client id the `aud` claim must contain
    pub fn new(jwks_client: Arc<JwksClient>, expected_issuer: String, audience: String) -> Self {
        Self {
            jwks_client,
            expected_issuer,
            audience,
        }
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// - `KeyFetch` - signing keys could not be retrieved
    /// - `InvalidAlgorithm` - header asserts anything other than RS256
    /// - `TokenValidation` - structure, key selection, signature, issuer,
    ///   audience or expiry check failed
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let keys = self.jwks_client.get_keys().await?;

        let header = parse_header(token).map_err(|e| {
            tracing::debug!(target: "api.auth.jwt", error = %e, "Token header rejected");
            AuthError::TokenValidation("malformed token".to_string())
        })?;

        if header.alg != EXPECTED_ALGORITHM {
            tracing::warn!(target: "api.auth.jwt", alg = %header.alg, "Token asserts unexpected algorithm");
            return Err(AuthError::InvalidAlgorithm(header.alg));
        }

        let kid = header.kid.ok_or_else(|| {
            tracing::debug!(target: "api.auth.jwt", "Token header has no key id");
            AuthError::TokenValidation("missing key id".to_string())
        })?;

        let jwk = keys.get(&kid).ok_or_else(|| {
            tracing::debug!(target: "api.auth.jwt", kid = %kid, "Token signed with unknown key");
            AuthError::TokenValidation("unknown signing key".to_string())
        })?;

        let decoding_key = decoding_key(jwk)?;
        let claims = self.decode_claims(token, &decoding_key)?;

        tracing::debug!(target: "api.auth.jwt", "Token verified successfully");
        Ok(claims)
    }

    fn decode_claims(&self, token: &str, key: &DecodingKey) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_issuer(&[self.expected_issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);

        decode::<TokenClaims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(target: "api.auth.jwt", error = %e, "Token verification failed");
                AuthError::TokenValidation(validation_reason(e.kind()))
            })
    }
}

/// Build an RS256 decoding key from a JWK.
fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    let unusable = || AuthError::TokenValidation("unusable signing key".to_string());

    if jwk.kty != "RSA" {
        tracing::warn!(target: "api.auth.jwt", kty = %jwk.kty, "Unexpected JWK key type");
        return Err(unusable());
    }
    if let Some(alg) = &jwk.alg {
        if alg != EXPECTED_ALGORITHM {
            tracing::warn!(target: "api.auth.jwt", alg = %alg, "Unexpected JWK algorithm");
            return Err(unusable());
        }
    }

    let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
        tracing::error!(target: "api.auth.jwt", kid = %jwk.kid, "JWK missing RSA components");
        return Err(unusable());
    };

    DecodingKey::from_rsa_components(n, e).map_err(|err| {
        tracing::error!(target: "api.auth.jwt", kid = %jwk.kid, error = %err, "Invalid RSA key components");
        unusable()
    })
}

fn validation_reason(kind: &ErrorKind) -> String {
    match kind {
        ErrorKind::ExpiredSignature => "expired".to_string(),
        ErrorKind::InvalidAudience => "audience mismatch".to_string(),
        ErrorKind::InvalidIssuer => "issuer mismatch".to_string(),
        ErrorKind::InvalidSignature => "invalid signature".to_string(),
        ErrorKind::ImmatureSignature => "not yet valid".to_string(),
        ErrorKind::MissingRequiredClaim(claim) => format!("missing required claim: {claim}"),
        _ => "malformed token".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ISSUER: &str = "https://login.example/tenant-1/v2.0";
    const AUDIENCE: &str = "client-id";

    fn rsa_jwk(kid: &str) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: kid.to_string(),
            alg: None,
            key_use: Some("sig".to_string()),
            n: Some("AQAB".to_string()),
            e: Some("AQAB".to_string()),
        }
    }

    fn unsigned_token(header: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        let payload_b64 = URL_SAFE_NO_PAD.encode(format!(
            r#"{{"oid":"abc123","iss":"{ISSUER}","aud":"{AUDIENCE}","exp":9999999999}}"#
        ));
        format!("{header_b64}.{payload_b64}.fake_signature")
    }

    async fn verifier_with_keys(keys: serde_json::Value) -> (MockServer, TokenVerifier) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/keys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(keys))
            .mount(&server)
            .await;

        let jwks_client = Arc::new(JwksClient::new(format!("{}/keys", server.uri())));
        let verifier = TokenVerifier::new(jwks_client, ISSUER.to_string(), AUDIENCE.to_string());
        (server, verifier)
    }

    fn default_keys() -> serde_json::Value {
        serde_json::json!({
            "keys": [{"kty": "RSA", "kid": "key-1", "use": "sig", "n": "AQAB", "e": "AQAB"}]
        })
    }

    #[test]
    fn test_validation_reason_mapping() {
        assert_eq!(validation_reason(&ErrorKind::ExpiredSignature), "expired");
        assert_eq!(validation_reason(&ErrorKind::InvalidAudience), "audience mismatch");
        assert_eq!(validation_reason(&ErrorKind::InvalidIssuer), "issuer mismatch");
        assert_eq!(validation_reason(&ErrorKind::InvalidSignature), "invalid signature");
        assert_eq!(validation_reason(&ErrorKind::ImmatureSignature), "not yet valid");
        assert_eq!(
            validation_reason(&ErrorKind::MissingRequiredClaim("aud".to_string())),
            "missing required claim: aud"
        );
        assert_eq!(validation_reason(&ErrorKind::InvalidToken), "malformed token");
    }

    #[test]
    fn test_decoding_key_rejects_non_rsa_key_type() {
        let mut jwk = rsa_jwk("k");
        jwk.kty = "OKP".to_string();
        assert_eq!(
            decoding_key(&jwk).err(),
            Some(AuthError::TokenValidation("unusable signing key".to_string()))
        );
    }

    #[test]
    fn test_decoding_key_rejects_other_declared_algorithm() {
        let mut jwk = rsa_jwk("k");
        jwk.alg = Some("RS512".to_string());
        assert!(decoding_key(&jwk).is_err());
    }

    #[test]
    fn test_decoding_key_rejects_missing_components() {
        let mut jwk = rsa_jwk("k");
        jwk.n = None;
        assert!(decoding_key(&jwk).is_err());
    }

    #[test]
    fn test_decoding_key_accepts_jwk_without_alg() {
        assert!(decoding_key(&rsa_jwk("k")).is_ok());

        let mut jwk = rsa_jwk("k");
        jwk.alg = Some("RS256".to_string());
        assert!(decoding_key(&jwk).is_ok());
    }

    #[tokio::test]
    async fn test_verify_rejects_alg_none() {
        let (_server, verifier) = verifier_with_keys(default_keys()).await;
        let token = unsigned_token(r#"{"alg":"none","typ":"JWT","kid":"key-1"}"#);

        assert_eq!(
            verifier.verify(&token).await.unwrap_err(),
            AuthError::InvalidAlgorithm("none".to_string())
        );
    }

    #[tokio::test]
    async fn test_verify_rejects_hmac_signed_token() {
        let (_server, verifier) = verifier_with_keys(default_keys()).await;

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("key-1".to_string());
        let claims = serde_json::json!({"oid": "abc123", "iss": ISSUER, "aud": AUDIENCE, "exp": 9_999_999_999_i64});
        let token = encode(&header, &claims, &EncodingKey::from_secret(b"AQAB")).unwrap();

        assert_eq!(
            verifier.verify(&token).await.unwrap_err(),
            AuthError::InvalidAlgorithm("HS256".to_string())
        );
    }

    #[tokio::test]
    async fn test_verify_rejects_missing_kid() {
        let (_server, verifier) = verifier_with_keys(default_keys()).await;
        let token = unsigned_token(r#"{"alg":"RS256","typ":"JWT"}"#);

        assert_eq!(
            verifier.verify(&token).await.unwrap_err(),
            AuthError::TokenValidation("missing key id".to_string())
        );
    }

    #[tokio::test]
    async fn test_verify_rejects_unknown_kid() {
        let (_server, verifier) = verifier_with_keys(default_keys()).await;
        let token = unsigned_token(r#"{"alg":"RS256","typ":"JWT","kid":"rotated-away"}"#);

        assert_eq!(
            verifier.verify(&token).await.unwrap_err(),
            AuthError::TokenValidation("unknown signing key".to_string())
        );
    }

    #[tokio::test]
    async fn test_verify_rejects_garbage() {
        let (_server, verifier) = verifier_with_keys(default_keys()).await;

        for token in ["", "not-a-jwt", "a.b", &"x".repeat(10_000)] {
            assert_eq!(
                verifier.verify(token).await.unwrap_err(),
                AuthError::TokenValidation("malformed token".to_string()),
                "token {token:.20} should be malformed"
            );
        }
    }

    #[tokio::test]
    async fn test_verify_rejects_forged_signature() {
        let (_server, verifier) = verifier_with_keys(default_keys()).await;
        let token = unsigned_token(r#"{"alg":"RS256","typ":"JWT","kid":"key-1"}"#);

        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthError::TokenValidation(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_propagates_key_fetch_failure() {
        let jwks_client = Arc::new(JwksClient::new("http://127.0.0.1:1/keys".to_string()));
        let verifier = TokenVerifier::new(jwks_client, ISSUER.to_string(), AUDIENCE.to_string());
        let token = unsigned_token(r#"{"alg":"RS256","kid":"key-1"}"#);

        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthError::KeyFetch(_))
        ));
    }
}
