use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LoadError;
use crate::resolver::Resolver;
use crate::specifier;

/// A dependency reported by a [`Transformer`], before it has been normalised by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dep {
    FilePath(PathBuf),
    Structured { protocol: String, pathname: String },
}

/// The outcome of invoking a [`Transformer`]. `NotHandled` means "this transformer doesn't apply
/// to this file", and the gateway falls through as if no transformer had been configured at all.
pub enum TransformOutcome {
    NotHandled,
    Handled {
        css: String,
        map: Option<parcel_sourcemap::SourceMap>,
        dependencies: Vec<Dep>,
    },
}

/// Context handed to a [`Transformer`] invocation.
pub struct TransformContext<'a> {
    pub from: &'a Path,
    pub resolver: &'a dyn Resolver,
    pub is_ignored: fn(&str) -> bool,
}

/// An optional preprocessor stage (SCSS, Less, …) producing plain CSS plus a source map and a
/// dependency list. The locator is agnostic to which backend is plugged in; it only depends on
/// this contract.
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(&self, source: &str, ctx: TransformContext<'_>) -> Result<TransformOutcome, LoadError>;
}

/// The result of running §4.C end to end: plain CSS plus a filtered, file-path-only dependency
/// list ready to be merged into the running `LoadResult`.
pub(crate) struct GatewayOutput {
    pub css: String,
    pub map: Option<parcel_sourcemap::SourceMap>,
    pub dependencies: Vec<PathBuf>,
}

/// Applies the configured transformer (or passthrough), then normalises its reported
/// dependencies: non-`file:` protocols become [`LoadError::UnsupportedProtocol`], remote
/// specifiers are filtered out entirely.
pub(crate) async fn run_gateway(
    transformer: &dyn Transformer,
    source: &str,
    from: &Path,
    resolver: &dyn Resolver,
) -> Result<GatewayOutput, LoadError> {
    let outcome = transformer
        .transform(
            source,
            TransformContext {
                from,
                resolver,
                is_ignored: specifier::is_ignored,
            },
        )
        .await?;

    let (css, map, raw_deps) = match outcome {
        TransformOutcome::NotHandled => (source.to_string(), None, Vec::new()),
        TransformOutcome::Handled { css, map, dependencies } => (css, map, dependencies),
    };

    let mut dependencies = Vec::with_capacity(raw_deps.len());
    for dep in raw_deps {
        match dep {
            Dep::FilePath(path) => {
                let as_str = path.to_string_lossy();
                if !specifier::is_ignored(&as_str) {
                    dependencies.push(path);
                }
            }
            Dep::Structured { protocol, pathname } => {
                if protocol != "file" {
                    return Err(LoadError::UnsupportedProtocol {
                        protocol,
                        dependency_of: from.to_path_buf(),
                    });
                }
                if !specifier::is_ignored(&pathname) {
                    dependencies.push(PathBuf::from(pathname));
                }
            }
        }
    }

    Ok(GatewayOutput { css, map, dependencies })
}

/// Dispatches by file extension: `.scss`/`.sass` go through a real, in-process Sass compiler;
/// everything else (including `.less`, which has no concrete backend wired in-tree — see
/// DESIGN.md) is reported as `NotHandled`, i.e. plain CSS.
#[derive(Debug, Default)]
pub struct DefaultTransformer;

#[async_trait]
impl Transformer for DefaultTransformer {
    async fn transform(&self, source: &str, ctx: TransformContext<'_>) -> Result<TransformOutcome, LoadError> {
        match ctx.from.extension().and_then(|e| e.to_str()) {
            Some("scss") | Some("sass") => {
                let options = grass::Options::default().load_path(
                    ctx.from
                        .parent()
                        .unwrap_or_else(|| Path::new(".")),
                );
                let css = grass::from_string(source.to_string(), &options).map_err(|err| LoadError::Syntax {
                    file: ctx.from.to_path_buf(),
                    line: 0,
                    column: 0,
                    message: err.to_string(),
                })?;
                // grass inlines `@import`/`@use` internally and doesn't expose the files it
                // touched through its public API, so we report none; the position mapper then
                // falls back to locations in the compiled output (see DESIGN.md).
                Ok(TransformOutcome::Handled {
                    css,
                    map: None,
                    dependencies: Vec::new(),
                })
            }
            _ => Ok(TransformOutcome::NotHandled),
        }
    }
}

/// A transformer that can be constructed from any `Arc<dyn Transformer>`, used internally so the
/// gateway always has a concrete receiver even when the caller configured none.
pub(crate) fn effective_transformer(configured: &Option<Arc<dyn Transformer>>) -> Arc<dyn Transformer> {
    configured
        .clone()
        .unwrap_or_else(|| Arc::new(DefaultTransformer) as Arc<dyn Transformer>)
}
