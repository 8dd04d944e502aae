use base64::Engine as _;
use ring::rand::{SecureRandom, SystemRandom};

/// 24 random bytes -> 32 URL-safe characters, 192 bits of entropy. Enough
/// that collisions are negligible without a retry loop; the token index
/// still rejects duplicates on insert.
const TOKEN_BYTES: usize = 24;

pub fn generate(rng: &SystemRandom) -> Result<String, ring::error::Unspecified> {
    let mut raw = [0u8; TOKEN_BYTES];
    rng.fill(&mut raw)?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw))
}
