use std::path::{Path, PathBuf};

use async_trait::async_trait;
use path_clean::PathClean;

use crate::error::LoadError;

/// A user-suppliable specifier resolver: maps a specifier relative to a requesting file to an
/// absolute filesystem path. Pure with respect to the locator — any side effects belong to the
/// implementation.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, specifier: &str, request_file: &Path) -> Option<PathBuf>;
}

const CANDIDATE_EXTENSIONS: [&str; 4] = ["css", "scss", "sass", "less"];

/// The resolver used when the caller supplies none: relative specifiers are resolved against the
/// requesting file's directory; bare specifiers walk up through `node_modules/<specifier>`,
/// Node-resolution style. No symlink resolution — the cache keys on mtime, so a clean
/// (non-canonicalized) absolute path is both correct and cheaper.
#[derive(Debug, Default)]
pub struct DefaultResolver;

#[async_trait]
impl Resolver for DefaultResolver {
    async fn resolve(&self, specifier: &str, request_file: &Path) -> Option<PathBuf> {
        let base_dir = request_file.parent()?;

        if specifier.starts_with('.') || specifier.starts_with('/') {
            let candidate = base_dir.join(specifier);
            return first_existing(&candidate).await;
        }

        let mut dir = Some(base_dir.to_path_buf());
        while let Some(current) = dir {
            let candidate = current.join("node_modules").join(specifier);
            if let Some(found) = first_existing(&candidate).await {
                return Some(found);
            }
            dir = current.parent().map(Path::to_path_buf);
        }
        None
    }
}

async fn first_existing(candidate: &Path) -> Option<PathBuf> {
    if tokio::fs::metadata(candidate).await.is_ok() {
        return Some(candidate.clean());
    }
    if candidate.extension().is_none() {
        for ext in CANDIDATE_EXTENSIONS {
            let with_ext = candidate.with_extension(ext);
            if tokio::fs::metadata(&with_ext).await.is_ok() {
                return Some(with_ext.clean());
            }
        }
    }
    None
}

/// Wraps a [`Resolver`] so a `None` outcome becomes a [`LoadError::Resolution`] reporting both
/// the specifier and the requesting file.
pub(crate) struct ResolverAdapter<'a> {
    resolver: &'a dyn Resolver,
}

impl<'a> ResolverAdapter<'a> {
    pub fn new(resolver: &'a dyn Resolver) -> Self {
        ResolverAdapter { resolver }
    }

    pub async fn resolve(&self, specifier: &str, request_file: &Path) -> Result<PathBuf, LoadError> {
        self.resolver
            .resolve(specifier, request_file)
            .await
            .ok_or_else(|| LoadError::Resolution {
                specifier: specifier.to_string(),
                request: request_file.to_path_buf(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn resolves_relative_specifier_with_literal_extension() {
        let dir = tempdir().unwrap();
        let entry = dir.path().join("entry.css");
        let target = dir.path().join("base.css");
        tokio::fs::write(&entry, "").await.unwrap();
        tokio::fs::write(&target, "").await.unwrap();

        let resolved = DefaultResolver.resolve("./base.css", &entry).await.unwrap();
        assert_eq!(resolved, target.clean());
    }

    #[tokio::test]
    async fn appends_candidate_extension_when_missing() {
        let dir = tempdir().unwrap();
        let entry = dir.path().join("entry.css");
        let target = dir.path().join("base.scss");
        tokio::fs::write(&entry, "").await.unwrap();
        tokio::fs::write(&target, "").await.unwrap();

        let resolved = DefaultResolver.resolve("./base", &entry).await.unwrap();
        assert_eq!(resolved, target.clean());
    }

    #[tokio::test]
    async fn bare_specifier_walks_up_node_modules() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("pkg").join("src");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        let entry = nested.join("entry.css");
        tokio::fs::write(&entry, "").await.unwrap();

        let node_modules_pkg = dir.path().join("node_modules").join("design-system");
        tokio::fs::create_dir_all(&node_modules_pkg).await.unwrap();
        let target = node_modules_pkg.join("tokens.css");
        tokio::fs::write(&target, "").await.unwrap();

        let resolved = DefaultResolver
            .resolve("design-system/tokens.css", &entry)
            .await
            .unwrap();
        assert_eq!(resolved, target.clean());
    }

    #[tokio::test]
    async fn unresolvable_specifier_reports_both_specifier_and_request() {
        let dir = tempdir().unwrap();
        let entry = dir.path().join("entry.css");
        tokio::fs::write(&entry, "").await.unwrap();

        let adapter = ResolverAdapter::new(&DefaultResolver);
        let err = adapter.resolve("./missing.css", &entry).await.unwrap_err();
        match err {
            LoadError::Resolution { specifier, request } => {
                assert_eq!(specifier, "./missing.css");
                assert_eq!(request, entry);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
