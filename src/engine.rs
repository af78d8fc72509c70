//! The load engine (§4.F): orchestrates a single file's load — cache lookup, read, transform,
//! parse, recursion on imports, and token assembly.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tracing::{debug, instrument, trace};

use crate::ast::{self, AtValue};
use crate::cache::CacheEntry;
use crate::error::LoadError;
use crate::location::PositionMapper;
use crate::resolver::ResolverAdapter;
use crate::specifier;
use crate::token::{LoadResult, Token};
use crate::transform;
use crate::Locator;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Entry point used both by the public `Locator::load` and by recursion within the engine itself.
/// Only the top-level caller (`Locator::load`) enforces the concurrency guard; this function
/// never touches it.
pub(crate) fn load_recursive<'a>(locator: &'a Locator, file_path: &'a Path) -> BoxFuture<'a, Result<LoadResult, LoadError>> {
    Box::pin(load_recursive_inner(locator, file_path))
}

#[instrument(level = "debug", skip(locator), fields(file = %file_path.display()))]
async fn load_recursive_inner(locator: &Locator, file_path: &Path) -> Result<LoadResult, LoadError> {
    let current_mtime = stat_mtime_ms(file_path).await;
    let probe = |p: &Path| -> Option<i64> {
        std::fs::metadata(p)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
    };

    {
        let cache = locator.cache.lock().await;
        if cache.is_in_progress(file_path) {
            debug!("cycle detected, breaking with empty result");
            return Ok(LoadResult::default());
        }
        if current_mtime.is_some() && !cache.is_stale(file_path, probe) {
            let entry = cache.get(file_path).expect("is_stale(false) implies an entry exists");
            trace!("cache hit");
            return Ok(entry.result.clone());
        }
    }

    {
        let mut cache = locator.cache.lock().await;
        cache.mark_in_progress(file_path.to_path_buf());
    }

    let outcome = load_uncached(locator, file_path).await;

    let mut cache = locator.cache.lock().await;
    match &outcome {
        Ok(result) => {
            let mtime = current_mtime.unwrap_or(0);
            cache.insert(
                file_path.to_path_buf(),
                CacheEntry {
                    mtime_ms: mtime,
                    result: result.clone(),
                },
            );
        }
        Err(_) => {
            // Leave no stale sentinel behind on failure so a later retry re-attempts the load.
            cache.forget(file_path);
        }
    }
    outcome
}

async fn stat_mtime_ms(file_path: &Path) -> Option<i64> {
    let metadata = tokio::fs::metadata(file_path).await.ok()?;
    let modified = metadata.modified().ok()?;
    let since_epoch = modified.duration_since(std::time::UNIX_EPOCH).ok()?;
    Some(since_epoch.as_millis() as i64)
}

async fn load_uncached(locator: &Locator, file_path: &Path) -> Result<LoadResult, LoadError> {
    let bytes = tokio::fs::read(file_path)
        .await
        .map_err(|source| LoadError::Io {
            path: file_path.to_path_buf(),
            source,
        })?;
    let source = String::from_utf8_lossy(&bytes).into_owned();

    let resolver = ResolverAdapter::new(locator.resolver.as_ref());
    let gateway = transform::run_gateway(locator.transformer.as_ref(), &source, file_path, locator.resolver.as_ref()).await?;

    let mapper = PositionMapper::new(gateway.map, file_path.to_path_buf());
    let ast = ast::collect(&gateway.css, file_path, &mapper)?;

    let mut result = LoadResult::default();
    for dep in gateway.dependencies {
        result.push_dependency(dep, file_path);
    }

    for import in &ast.imports {
        if specifier::is_ignored(&import.specifier) {
            continue;
        }
        let resolved = resolver.resolve(&import.specifier, file_path).await?;
        let imported = load_recursive(locator, &resolved).await?;
        result.push_dependency(resolved.clone(), file_path);
        for dep in &imported.dependencies {
            result.push_dependency(dep.clone(), file_path);
        }
        for token in imported.tokens {
            result.push_token(token);
        }
    }

    for composes_specifier in &ast.composes_specifiers {
        if specifier::is_ignored(composes_specifier) {
            continue;
        }
        let resolved = resolver.resolve(composes_specifier, file_path).await?;
        let imported = load_recursive(locator, &resolved).await?;
        result.push_dependency(resolved.clone(), file_path);
        for dep in &imported.dependencies {
            result.push_dependency(dep.clone(), file_path);
        }
        // `composes` pulls in another sheet's class semantics but mints no token of its own
        // (§1) — only the dependency edge is recorded.
    }

    for occurrence in &ast.class_selectors {
        if ast.local_token_names.contains(&occurrence.name) {
            result.push_token(Token::new(occurrence.name.clone(), occurrence.location.clone()));
        }
    }

    for value in &ast.at_values {
        match value {
            AtValue::Declaration(decl) => {
                result.push_token(Token::new(decl.token_name.clone(), decl.location.clone()));
            }
            AtValue::ImportDeclaration(import) => {
                if specifier::is_ignored(&import.from) {
                    continue;
                }
                let resolved = resolver.resolve(&import.from, file_path).await?;
                let imported = load_recursive(locator, &resolved).await?;
                result.push_dependency(resolved.clone(), file_path);
                for dep in &imported.dependencies {
                    result.push_dependency(dep.clone(), file_path);
                }
                for value_import in &import.imports {
                    if let Some(source_token) = imported
                        .tokens
                        .iter()
                        .find(|t| t.name == value_import.imported_token_name)
                    {
                        let mut token = Token::new(
                            value_import.local_token_name.clone(),
                            source_token.original_location.clone(),
                        );
                        if value_import.local_token_name != value_import.imported_token_name {
                            token = token.with_imported_name(value_import.imported_token_name.clone());
                        }
                        result.push_token(token);
                    }
                    // No matching export: silently contributes no token, per spec.
                }
            }
        }
    }

    result.finalize(file_path);
    Ok(result)
}
