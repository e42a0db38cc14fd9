use crate::config::SecurityConfig;
use crate::error::Error;
use anyhow::Result;
use bcrypt::{hash, verify};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Hash a password or client secret with bcrypt
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let hashed = hash(password, config.password_hash_cost)
        .map_err(|e| Error::Authentication(format!("Failed to hash password: {}", e)))?;

    Ok(hashed)
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let result = verify(password, hash)
        .map_err(|e| Error::Authentication(format!("Failed to verify password: {}", e)))?;

    Ok(result)
}

/// Generate a random password
pub fn generate_random_password(length: usize) -> String {
    const CHARSET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()";

    let mut rng = thread_rng();
    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Generate a client secret; alphanumeric so it survives form encoding
pub fn generate_client_secret(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> SecurityConfig {
        SecurityConfig {
            password_hash_cost: 4,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn hash_then_verify() {
        let hashed = hash_password("correct horse", &fast()).unwrap();
        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("battery staple", &hashed).unwrap());
    }

    #[test]
    fn generated_secrets() {
        assert_eq!(generate_random_password(12).chars().count(), 12);
        let secret = generate_client_secret(32);
        assert_eq!(secret.len(), 32);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(secret, generate_client_secret(32));
    }
}
