use anyhow::Context;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

const RESET_TOKEN_BYTES: usize = 32;

/// Generate a fresh reset secret. Returns the plaintext (emailed to the user,
/// never persisted) and its hash (the only thing stored on the user row).
///
/// The secret is high-entropy random data, so a single fast SHA-256 pass is
/// enough for storage; the slow password hash is not needed here.
pub fn generate_reset_token() -> anyhow::Result<(String, String)> {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate reset token")?;
    let token = Base64UrlUnpadded::encode_string(&bytes);
    let hash = hash_reset_token(&token);
    Ok((token, hash))
}

/// Hash a presented reset secret for lookup against the stored hash.
pub fn hash_reset_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    Base64UrlUnpadded::encode_string(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique() {
        let (a, _) = generate_reset_token().expect("generate");
        let (b, _) = generate_reset_token().expect("generate");
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_deterministic_for_lookup() {
        let (token, stored_hash) = generate_reset_token().expect("generate");
        assert_eq!(hash_reset_token(&token), stored_hash);
    }

    #[test]
    fn plaintext_never_equals_stored_hash() {
        let (token, stored_hash) = generate_reset_token().expect("generate");
        assert_ne!(token, stored_hash);
    }

    #[test]
    fn different_secrets_hash_differently() {
        assert_ne!(hash_reset_token("secret-one"), hash_reset_token("secret-two"));
    }
}
