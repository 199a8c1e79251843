//! Password hashing (Argon2id, PHC strings) and the password strength policy.

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("random salt unavailable: {0}")]
    Salt(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hash `password` into a self-describing PHC string.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| PasswordError::Salt(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Salt(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check `password` against a stored PHC string. Unparseable hashes never match.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

const COMMON_PASSWORDS: &[&str] = &[
    "123456", "password", "12345678", "qwerty", "123456789", "12345", "1234", "111111",
    "1234567", "dragon", "123123", "baseball", "abc123", "football", "monkey", "letmein",
    "696969", "shadow", "master", "666666", "qwertyuiop", "123321", "mustang", "1234567890",
    "michael", "654321", "superman", "1qaz2wsx", "7777777", "121212", "000000", "qazwsx",
    "123qwe", "killer", "trustno1", "jordan", "jennifer", "zxcvbnm", "asdfgh", "hunter",
    "buster", "soccer", "harley", "batman", "andrew", "tigger", "sunshine", "iloveyou",
    "2000", "charlie", "robert", "thomas", "hockey", "ranger", "daniel", "starwars",
    "klaster", "112233", "george", "computer", "michelle", "jessica", "pepper", "1111",
    "zxcvbn", "555555", "11111111", "131313", "freedom", "777777", "pass", "maggie",
    "159753", "aaaaaa", "ginger", "princess", "joshua", "cheese", "amanda", "summer",
    "love", "ashley", "nicole", "chelsea", "biteme", "matthew", "access", "yankees",
    "987654321", "dallas", "austin", "thunder", "taylor", "matrix", "password1",
    "password123", "welcome", "welcome1", "admin", "administrator", "passw0rd",
    "azerty", "motdepasse", "changeme", "qwerty123", "iloveyou1", "football1",
];

/// Password strength rules applied at registration and administrative
/// password changes.
///
/// Mirrors the usual web-framework defaults: minimum length, no common
/// passwords, not entirely numeric, not too close to the user's own details.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    /// Reject when an attribute covers at least this share of the password.
    pub max_similarity: f64,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_similarity: 0.7,
        }
    }
}

impl PasswordPolicy {
    /// Every rule `password` breaks, as user-facing messages. Empty means ok.
    ///
    /// `attributes` are the user's own details (email, names) used for the
    /// similarity rule.
    pub fn check(&self, password: &str, attributes: &[&str]) -> Vec<String> {
        let mut problems = Vec::new();

        if password.chars().count() < self.min_length {
            problems.push(format!(
                "This password is too short. It must contain at least {} characters.",
                self.min_length
            ));
        }

        let lowered = password.to_lowercase();
        if COMMON_PASSWORDS.contains(&lowered.trim()) {
            problems.push("This password is too common.".to_string());
        }

        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            problems.push("This password is entirely numeric.".to_string());
        }

        if attributes.iter().any(|attr| self.too_similar(&lowered, attr)) {
            problems.push("The password is too similar to your personal information.".to_string());
        }

        problems
    }

    fn too_similar(&self, password: &str, attribute: &str) -> bool {
        let attribute = attribute.trim().to_lowercase();
        // The local part of an email is what people reuse.
        let attribute = attribute.split('@').next().unwrap_or_default();
        if attribute.chars().count() < 3 || password.is_empty() {
            return false;
        }
        if password.contains(attribute) || attribute.contains(password) {
            let shorter = attribute.chars().count().min(password.chars().count()) as f64;
            let longer = attribute.chars().count().max(password.chars().count()) as f64;
            return shorter / longer >= self.max_similarity;
        }
        longest_common_substring(password, attribute) as f64 / password.chars().count() as f64
            >= self.max_similarity
    }
}

fn longest_common_substring(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut best = 0;
    let mut prev = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        let mut row = vec![0usize; b.len() + 1];
        for j in 1..=b.len() {
            if a[i - 1] == b[j - 1] {
                row[j] = prev[j - 1] + 1;
                best = best.max(row[j]);
            }
        }
        prev = row;
    }
    best
}
