use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const SESSION_TOKEN_BYTES: usize = 32;
const SALT_BYTES: usize = 16;

/// Salted SHA-256 password digest, both halves url-safe base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    salt: String,
    digest: String,
}

impl PasswordHash {
    pub fn new<R: RngCore>(rng: &mut R, password: &str) -> Self {
        let mut salt = [0u8; SALT_BYTES];
        rng.fill_bytes(&mut salt);
        let digest = salted_digest(&salt, password);
        Self {
            salt: encode(&salt),
            digest: encode(&digest),
        }
    }

    pub fn verify(&self, password: &str) -> bool {
        let Ok(salt) = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(&self.salt) else {
            return false;
        };
        let candidate = encode(&salted_digest(&salt, password));
        hashes_equal(candidate.as_bytes(), self.digest.as_bytes())
    }
}

fn salted_digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    to_array(&hasher.finalize())
}

/// Generate a URL-safe token from random bytes.
pub fn generate_token<R: RngCore>(rng: &mut R, nbytes: usize) -> String {
    let mut buf = vec![0u8; nbytes];
    rng.fill_bytes(&mut buf);
    encode(&buf)
}

/// Hash a session token; this is what the session store keys on.
pub fn hash_token(token: &str) -> [u8; 32] {
    to_array(&Sha256::digest(token.as_bytes()))
}

fn to_array(digest: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(digest);
    out
}

pub fn hashes_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
