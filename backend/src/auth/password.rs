use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(OsRng);
    let password_hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(password_hash.to_string())
}

/// Verify a password against a stored hash; accounts without a hash can never log in
pub fn verify_password(password: &str, hash: Option<&str>) -> Result<bool, Error> {
    let hash = hash.ok_or(Error::Password)?;
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Minimal policy for passwords set by admins on tenant accounts and by the CLI.
pub fn check_password_policy(password: &str) -> Result<(), String> {
    if password.trim().is_empty() {
        return Err("password cannot be empty".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!("password must be at least {MIN_PASSWORD_LENGTH} characters"));
    }
    Ok(())
}
