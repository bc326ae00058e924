use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use neighborly_types::api::Claims;

use crate::error::ApiError;

/// Issued tokens expire after one day.
const TOKEN_TTL_HOURS: i64 = 24;

/// Hash a password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// A stored hash that fails to parse counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

pub(crate) fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), ApiError> {
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::bad_request("Username must be 3 to 32 characters"));
    }
    if !looks_like_email(email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if password.len() < 8 {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("Password123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Password123", &hash));
        assert!(!verify_password("password123", &hash));
        assert!(!verify_password("Password123", "not-a-hash"));
    }

    #[test]
    fn token_roundtrip_and_wrong_secret() {
        let id = Uuid::new_v4();
        let token = create_token("secret-a", id, "amara").unwrap();

        let claims = decode_token("secret-a", &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "amara");

        assert!(decode_token("secret-b", &token).is_err());
        assert!(decode_token("secret-a", "garbage").is_err());
    }

    #[test]
    fn registration_rules() {
        assert!(validate_registration("amara", "amara@example.com", "Password123").is_ok());
        assert!(validate_registration("am", "amara@example.com", "Password123").is_err());
        assert!(validate_registration("amara", "amara.example.com", "Password123").is_err());
        assert!(validate_registration("amara", "amara@example", "Password123").is_err());
        assert!(validate_registration("amara", "amara@example.com", "short").is_err());
    }
}
