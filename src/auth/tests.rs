//! Auth Tests

#[cfg(test)]
mod tests {
    use crate::auth::{bearer_token, hash_password, verify_password, AuthContext, AuthError};
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn test_token_roundtrip() {
        // ARRANGE
        let auth = AuthContext::new("test-secret");

        // ACT
        let token = auth.issue_token(42, "alice").unwrap();
        let claims = auth.validate_token(&token).unwrap();

        // ASSERT
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.login, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let issuer = AuthContext::new("secret-a");
        let verifier = AuthContext::new("secret-b");

        let token = issuer.issue_token(42, "alice").unwrap();

        assert!(matches!(
            verifier.validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let auth = AuthContext::new("test-secret");
        let mut token = auth.issue_token(42, "alice").unwrap();
        token.push('x');

        assert!(auth.validate_token(&token).is_err());
    }

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        // Scheme is case-insensitive
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("bearer abc"),
        );
        assert_eq!(bearer_token(&headers), Some("abc"));

        // Missing or malformed headers yield nothing
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic abc"),
        );
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_authorize_requires_token() {
        let auth = AuthContext::new("test-secret");

        assert!(matches!(
            auth.authorize(&HeaderMap::new()),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn test_password_digest_roundtrip() {
        let digest = hash_password("hunter2");

        assert!(verify_password("hunter2", &digest));
        assert!(!verify_password("hunter3", &digest));
        // Plaintext never appears in the stored form
        assert!(!digest.contains("hunter2"));
    }

    #[test]
    fn test_password_digests_are_salted() {
        // Same password, different salt, different digest
        assert_ne!(hash_password("hunter2"), hash_password("hunter2"));
    }
}
