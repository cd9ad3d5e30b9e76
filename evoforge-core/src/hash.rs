use sha2::{Digest, Sha256};

/// First `len` hex characters of the SHA-256 of `parts` joined by NUL.
pub fn short_digest(parts: &[&str], len: usize) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_bytes());
    }
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(len);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_digest_is_sha256_prefix() {
        // sha256("hello") = 2cf24dba5fb0a30e...
        assert_eq!(short_digest(&["hello"], 8), "2cf24dba");
        assert_eq!(short_digest(&["hello"], 16), "2cf24dba5fb0a30e");
    }

    #[test]
    fn short_digest_separates_parts() {
        assert_ne!(short_digest(&["ab", "c"], 16), short_digest(&["a", "bc"], 16));
    }
}
