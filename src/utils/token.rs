use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

pub fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// A one-time token and the hash that gets stored in its place.
pub fn generate_reset_token() -> (String, String) {
    let token = random_token(32);
    let hash = hash_token(&token);
    (token, hash)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
