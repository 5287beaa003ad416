use argon2::Argon2;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use tracing::warn;

pub const MIN_LEN: usize = 8;
pub const MAX_LEN: usize = 255;

pub fn is_valid(pw: &str) -> bool {
    (MIN_LEN..=MAX_LEN).contains(&pw.len())
}

/// Argon2 PHC string for `password`, salted from the OS RNG.
pub fn hash(password: &str) -> anyhow::Result<String> {
    if password.is_empty() {
        anyhow::bail!("empty password");
    }
    let mut salt_raw = [0u8; 16];
    getrandom::getrandom(&mut salt_raw).map_err(|e| anyhow::anyhow!("getrandom: {e:?}"))?;
    let salt =
        SaltString::encode_b64(&salt_raw).map_err(|e| anyhow::anyhow!("salt encode: {e:?}"))?;
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("hash: {e:?}"))?
        .to_string())
}

pub fn verify(password: &str, phc: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(phc) else {
        warn!("bad password hash format");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
