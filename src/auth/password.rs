use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Hash a plaintext password into a PHC string. Called exactly once per
/// account, at registration; saving profile fields never re-hashes.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_a_salted_phc_string() {
        let hash = hash_password("s3cret-roommate").expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert_ne!(hash, "s3cret-roommate");

        // a fresh salt every call, and both hashes still verify
        let again = hash_password("s3cret-roommate").expect("hash");
        assert_ne!(hash, again);
        assert!(verify_password("s3cret-roommate", &hash).expect("verify"));
        assert!(verify_password("s3cret-roommate", &again).expect("verify"));
    }

    #[test]
    fn verify_is_exact_about_whitespace() {
        // register and login trim before hashing/verifying, so the stored
        // hash covers the trimmed form only
        let hash = hash_password("movein2024").expect("hash");
        assert!(verify_password("movein2024", &hash).expect("verify"));
        assert!(!verify_password("movein2024 ", &hash).expect("verify"));
        assert!(!verify_password("MOVEIN2024", &hash).expect("verify"));
    }

    #[test]
    fn verify_errors_on_non_phc_hash() {
        assert!(verify_password("anything", "plaintext-in-the-column").is_err());
        assert!(verify_password("anything", "").is_err());
    }
}
