use axum::http::{HeaderMap, HeaderValue, header};
use chrono::Utc;
use jsonwebtoken as jwt;

use crate::auth::*;
use crate::cfg;
use crate::db::Role;
use crate::tests::common::JWT_SECRET;

fn jwt_context() -> JwtContext {
    let settings = cfg::JwtSettings {
        access_token_expiry: 900,
        refresh_token_expiry: 3600,
    };
    JwtContext::new(&settings, JWT_SECRET)
}

#[test]
fn test_access_token_carries_role_into_session() {
    let ctx = jwt_context();

    for (user_id, role) in [(1, Role::Admin), (2, Role::Staff), (41, Role::Tenant)] {
        let token = generate_access_token(&ctx, user_id, "resident", role).unwrap();
        let claims = decode_access_token(&ctx, &token).unwrap();
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 900);

        let session = Session::try_from(&claims).unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.role, role);
        assert_eq!(session.is_manager(), role != Role::Tenant);
    }
}

#[test]
fn test_session_rejects_non_numeric_subject() {
    let claims = AccessTokenClaims {
        sub: "unit-12".to_string(),
        username: "resident".to_string(),
        role: Role::Tenant,
        exp: 0,
        iat: 0,
        jti: String::new(),
        token_type: TokenType::Access,
    };
    assert!(matches!(Session::try_from(&claims), Err(JwtError::InvalidToken)));
}

#[test]
fn test_refresh_token_cannot_open_a_session() {
    let ctx = jwt_context();
    let refresh = generate_refresh_token(&ctx, 41).unwrap();
    let access = generate_access_token(&ctx, 41, "resident", Role::Tenant).unwrap();

    assert!(matches!(decode_access_token(&ctx, &refresh), Err(JwtError::InvalidToken)));
    assert!(matches!(decode_refresh_token(&ctx, &access), Err(JwtError::InvalidToken)));
    assert_eq!(decode_refresh_token(&ctx, &refresh).unwrap().sub, "41");
}

#[test]
fn test_lapsed_manager_token_is_expired() {
    let ctx = jwt_context();
    let issued = Utc::now().timestamp() - 7200;
    let claims = AccessTokenClaims {
        sub: "2".to_string(),
        username: "staff".to_string(),
        role: Role::Staff,
        exp: issued + 900,
        iat: issued,
        jti: "lapsed".to_string(),
        token_type: TokenType::Access,
    };
    let token = jwt::encode(&jwt::Header::default(), &claims, &ctx.encoding_key).unwrap();

    assert!(matches!(decode_access_token(&ctx, &token), Err(JwtError::TokenExpired)));
}

#[test]
fn test_bearer_header_is_required() {
    let ctx = jwt_context();
    let token = generate_access_token(&ctx, 1, "admin", Role::Admin).unwrap();

    let mut headers = HeaderMap::new();
    assert!(matches!(
        decode_access_token_from_headers(&ctx, &headers),
        Err(JwtError::InvalidAuthorizationHeader)
    ));

    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&token).unwrap());
    assert!(matches!(
        decode_access_token_from_headers(&ctx, &headers),
        Err(JwtError::InvalidAuthorizationHeader)
    ));

    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
    let claims = decode_access_token_from_headers(&ctx, &headers).unwrap();
    assert_eq!(claims.role, Role::Admin);
}
