use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub username: String,
    pub exp: i64,    // expiration time
    pub iat: i64,    // issued at
    pub jti: String, // JWT ID
}

impl Claims {
    pub fn new(user_id: String, username: String, expiration_hours: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours as i64);

        Self {
            sub: user_id,
            username,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Opaque refresh token: `{id}.{secret}` goes to the client, only the
/// argon2 hash of the secret is persisted.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    #[serde(skip)]
    secret: String,
}

impl RefreshToken {
    pub fn encoded(&self) -> String {
        format!("{}.{}", self.id, self.secret)
    }
}

pub fn create_access_token(
    user_id: String,
    username: String,
    secret: &str,
    expiration_hours: u64,
) -> anyhow::Result<String> {
    let claims = Claims::new(user_id, username, expiration_hours);
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

pub fn verify_access_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let validation = Validation::default();
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    Ok(token_data.claims)
}

pub fn create_refresh_token(user_id: String, expiration_days: u64) -> anyhow::Result<RefreshToken> {
    let secret = Uuid::new_v4().to_string();
    let token_hash = hash_refresh_secret(&secret)?;
    let expires_at = Utc::now() + Duration::days(expiration_days as i64);

    Ok(RefreshToken {
        id: Uuid::new_v4().to_string(),
        user_id,
        token_hash,
        expires_at,
        secret,
    })
}

/// Splits an encoded refresh token into (id, secret).
pub fn decode_refresh_token(encoded: &str) -> anyhow::Result<(String, String)> {
    let (id, secret) = encoded
        .split_once('.')
        .ok_or_else(|| anyhow::anyhow!("Malformed refresh token"))?;
    if id.is_empty() || secret.is_empty() {
        return Err(anyhow::anyhow!("Malformed refresh token"));
    }
    Ok((id.to_string(), secret.to_string()))
}

pub fn hash_refresh_secret(secret: &str) -> anyhow::Result<String> {
    use argon2::password_hash::{rand_core::OsRng, SaltString};
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let token_hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash refresh token: {}", e))?;

    Ok(token_hash.to_string())
}

pub fn verify_refresh_secret(secret: &str, hash: &str) -> anyhow::Result<bool> {
    use argon2::password_hash::PasswordHash;
    use argon2::{Argon2, PasswordVerifier};

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid refresh token hash: {}", e))?;

    let argon2 = Argon2::default();
    match argon2.verify_password(secret.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Refresh token verification error: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_verify_access_token() {
        let token = create_access_token("user-123".into(), "bob".into(), "secret", 1)
            .expect("create token");
        let claims = verify_access_token(&token, "secret").expect("verify token");
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.username, "bob");
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token =
            create_access_token("user-123".into(), "bob".into(), "secret", 1).expect("create");
        assert!(verify_access_token(&token, "other-secret").is_err());
    }

    #[test]
    fn refresh_token_round_trip() {
        let token = create_refresh_token("user-1".into(), 7).expect("create refresh token");
        let encoded = token.encoded();
        let (id, secret) = decode_refresh_token(&encoded).expect("decode");
        assert_eq!(id, token.id);
        assert!(verify_refresh_secret(&secret, &token.token_hash).unwrap());
        assert!(!verify_refresh_secret("wrong", &token.token_hash).unwrap());
    }

    #[test]
    fn decode_rejects_malformed_token() {
        assert!(decode_refresh_token("no-separator").is_err());
        assert!(decode_refresh_token(".secret-only").is_err());
    }
}
