/// Case-sensitive prefix of the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Pull the token out of an `Authorization` header value.
///
/// A missing header, a different scheme, or an empty token all read as "no
/// token"; callers treat every one of them as unauthenticated.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(None), None);
        assert_eq!(extract_bearer(Some("Token xyz")), None);
        assert_eq!(extract_bearer(Some("bearer abc")), None); // case-sensitive
        assert_eq!(extract_bearer(Some("Bearer ")), None);
        assert_eq!(extract_bearer(Some("Bearerabc")), None);
        assert_eq!(extract_bearer(Some("")), None);
    }
}
