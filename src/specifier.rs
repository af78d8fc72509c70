//! Specifier classification: deciding whether an `@import`/`@value … from` argument is a remote
//! URL we never attempt to resolve.

/// True iff `specifier` begins with `http://` or `https://`. Applied uniformly before any
/// resolution attempt, for both transformer-reported dependencies and AST-collected imports.
pub fn is_ignored(specifier: &str) -> bool {
    specifier.starts_with("http://") || specifier.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_remote_schemes() {
        assert!(is_ignored("https://fonts.googleapis.com/css"));
        assert!(is_ignored("http://example.com/a.css"));
        assert!(!is_ignored("./local.css"));
        assert!(!is_ignored("package/file.css"));
    }
}
