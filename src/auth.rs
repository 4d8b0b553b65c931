/// Exact-match API key check.
///
/// A missing key never matches, even when the configured secret is empty.
pub fn api_key_matches(provided: Option<&str>, expected: &str) -> bool {
    match provided {
        Some(p) => constant_time_eq(p.as_bytes(), expected.as_bytes()),
        None => false,
    }
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_key_only() {
        assert!(api_key_matches(Some("Ee-osjmRSwyXkPA3QBFe"), "Ee-osjmRSwyXkPA3QBFe"));
        assert!(!api_key_matches(Some("Ee-osjmRSwyXkPA3QBFf"), "Ee-osjmRSwyXkPA3QBFe"));
        assert!(!api_key_matches(Some("Ee"), "Ee-osjmRSwyXkPA3QBFe"));
        assert!(!api_key_matches(None, "Ee-osjmRSwyXkPA3QBFe"));
    }

    #[test]
    fn missing_key_rejected_even_with_empty_secret() {
        assert!(!api_key_matches(None, ""));
        assert!(api_key_matches(Some(""), ""));
    }
}
