//! Registration secret generation.

use rand::Rng;

/// Alphabet of generated secrets.
const SECRET_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Default length of a registration secret.
pub const DEFAULT_SECRET_LENGTH: usize = 10;

/// Generates a random alphanumeric secret of `length` characters.
#[must_use]
pub fn generate_secret(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(SECRET_CHARSET[rng.gen_range(0..SECRET_CHARSET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lengths() {
        assert_eq!(generate_secret(DEFAULT_SECRET_LENGTH).len(), 10);
        assert_eq!(generate_secret(1).len(), 1);
        assert_eq!(generate_secret(20).len(), 20);
        assert_eq!(generate_secret(0), "");
    }

    #[test]
    fn test_alphanumeric_only() {
        for _ in 0..100 {
            assert!(generate_secret(50).chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_successive_calls_differ() {
        let secrets: HashSet<String> = (0..20).map(|_| generate_secret(50)).collect();
        assert_eq!(secrets.len(), 20);
    }
}
