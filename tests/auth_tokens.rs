//! Token and password flows exercised through the public crate API.

use forgefit_backend::utils::jwt::{
    create_access_token, create_refresh_token, decode_refresh_token, verify_access_token,
    verify_refresh_secret,
};
use forgefit_backend::utils::password::{hash_password, verify_password};

#[test]
fn access_token_round_trip_preserves_claims() {
    let token = create_access_token("user-42".into(), "carol".into(), "test-secret", 2)
        .expect("token creation");
    let claims = verify_access_token(&token, "test-secret").expect("verification");
    assert_eq!(claims.sub, "user-42");
    assert_eq!(claims.username, "carol");
    assert!(claims.exp > claims.iat);
}

#[test]
fn tampered_access_token_is_rejected() {
    let token =
        create_access_token("user-42".into(), "carol".into(), "test-secret", 2).expect("create");
    let mut tampered = token.clone();
    tampered.push('x');
    assert!(verify_access_token(&tampered, "test-secret").is_err());
    assert!(verify_access_token(&token, "other-secret").is_err());
}

#[test]
fn refresh_token_client_encoding_round_trips() {
    let token = create_refresh_token("user-42".into(), 7).expect("create");
    let encoded = token.encoded();

    let (id, secret) = decode_refresh_token(&encoded).expect("decode");
    assert_eq!(id, token.id);
    assert!(verify_refresh_secret(&secret, &token.token_hash).expect("verify"));
    assert!(!verify_refresh_secret("guessed", &token.token_hash).expect("verify"));
}

#[test]
fn password_hashes_are_salted_and_verifiable() {
    let first = hash_password("hunter2hunter2").expect("hash");
    let second = hash_password("hunter2hunter2").expect("hash");
    assert_ne!(first, second);
    assert!(verify_password("hunter2hunter2", &first).expect("verify"));
    assert!(!verify_password("hunter3hunter3", &first).expect("verify"));
}
