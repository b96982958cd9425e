/// Password hashing and verification using Argon2id
///
/// Hashes are stored as self-describing PHC strings:
/// `$argon2id$v=19$m=<mem>,t=<iters>,p=<lanes>$<salt>$<digest>`
///
/// - Salt: 16 bytes random per hash, never a fixed global salt
/// - Cost parameters come from [`HashingConfig`] and are embedded in the hash,
///   so verification keeps working after the configured cost changes
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use fishclaim_core::config::{MAX_HASH_MEMORY_KIB, MAX_HASH_PARALLELISM, MAX_HASH_TIME_COST};
use fishclaim_core::HashingConfig;
use thiserror::Error;

/// Minimum accepted password length at registration
pub const MIN_PASSWORD_LEN: usize = 4;

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("Failed to hash password: {0}")]
    HashingFailed(String),
}

fn argon2_for(config: &HashingConfig) -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(
        config.memory_cost,
        config.time_cost,
        config.parallelism,
        None,
    )
    .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

/// Hash a plaintext password
///
/// # Returns
///
/// * `Ok(String)` - PHC string (algorithm, parameters, salt and digest)
/// * `Err(PasswordError)` - If the configured parameters are rejected
///
/// # Example
///
/// ```no_run
/// use fishclaim_api::auth::password::{hash_password, verify_password};
/// use fishclaim_core::HashingConfig;
///
/// let hash = hash_password("pw123", &HashingConfig::default()).unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// assert!(verify_password("pw123", &hash));
/// ```
pub fn hash_password(password: &str, config: &HashingConfig) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = argon2_for(config)?;

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored hash
///
/// Returns `false` for a wrong password and for any stored value that cannot
/// be parsed or verified (malformed, truncated, or a foreign scheme left over
/// from older records). Verification never surfaces an error to the login path.
///
/// Stored costs above the hashing ceilings are refused without running Argon2.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parsed_hash = match PasswordHash::new(stored) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::debug!(error = %e, "Stored password hash is not a valid PHC string");
            return false;
        }
    };

    if !within_cost_ceiling(&parsed_hash) {
        tracing::warn!("Stored password hash exceeds the verification cost ceiling");
        return false;
    }

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => true,
        Err(argon2::password_hash::Error::Password) => false,
        Err(e) => {
            tracing::debug!(error = %e, "Stored password hash could not be verified");
            false
        }
    }
}

fn within_cost_ceiling(hash: &PasswordHash<'_>) -> bool {
    match Params::try_from(hash) {
        Ok(params) => {
            params.m_cost() <= MAX_HASH_MEMORY_KIB
                && params.t_cost() <= MAX_HASH_TIME_COST
                && params.p_cost() <= MAX_HASH_PARALLELISM
        }
        Err(_) => false,
    }
}

/// Validate password strength
///
/// Checks the minimum requirements applied at registration:
/// - At least [`MIN_PASSWORD_LEN`] characters
/// - Not only whitespace
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }

    if password.trim().is_empty() {
        return Err("Password must not be blank".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_config() -> HashingConfig {
        HashingConfig {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("pw123", &light_config()).expect("Failed to hash password");

        assert!(verify_password("pw123", &hash));
        assert!(!verify_password("pw124", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let config = light_config();
        let hash1 = hash_password("SamePassword", &config).unwrap();
        let hash2 = hash_password("SamePassword", &config).unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password("SamePassword", &hash1));
        assert!(verify_password("SamePassword", &hash2));
    }

    #[test]
    fn test_malformed_hash_fails_closed() {
        for stored in [
            "",
            "invalid-hash-format",
            "$argon2id$v=19$",
            "$argon2id$v=19$m=1024,t=1,p=1$bm90LWEtc2FsdA$",
            "$pbkdf2-sha256$29000$N2bsfU8pZWzNeY8RYizFuA$bXrtoXhHYxCv2ssbXGLavVrUl0hXqPaFy6iEL3WhFkE",
            "plaintext-password",
        ] {
            assert!(!verify_password("pw123", stored), "stored: {stored:?}");
        }
    }

    #[test]
    fn test_excessive_stored_costs_are_refused() {
        let hash = hash_password("pw123", &light_config()).unwrap();
        assert!(verify_password("pw123", &hash));

        let huge_memory = hash.replacen("m=1024", "m=4194304", 1);
        assert!(!verify_password("pw123", &huge_memory));

        let huge_time = hash.replacen("t=1", "t=1000000", 1);
        assert!(!verify_password("pw123", &huge_time));
    }

    #[test]
    fn test_hash_embeds_parameters() {
        let hash = hash_password("pw123", &light_config()).unwrap();

        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=1024"));
        assert!(hash.contains("t=1"));
        assert!(hash.contains("p=1"));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let config = HashingConfig {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 0,
        };
        assert!(matches!(
            hash_password("pw123", &config),
            Err(PasswordError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_password_strength_validation() {
        assert!(validate_password_strength("pw123").is_ok());
        assert!(validate_password_strength("correct horse").is_ok());

        assert!(validate_password_strength("pw1").is_err());
        assert!(validate_password_strength("       ").is_err());
    }
}
