//! Resolves, parses and memoises the CSS Modules token graph reachable from a root stylesheet.
//!
//! [`Locator`] is the only public entry point: given a root file path it walks `@import` and
//! `@value … from` references transitively, returning every exported [`token::Token`] plus the
//! set of files the sheet depends on. Everything downstream of that — `.d.ts` formatting,
//! file-writing, watch-mode wiring — is deliberately out of scope; see the crate's design
//! document for the split.

mod ast;
mod cache;
mod engine;
mod error;
mod locals;
mod location;
mod resolver;
mod specifier;
mod token;
mod transform;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::instrument;

pub use error::{LoadError, Result};
pub use location::Location;
pub use resolver::{DefaultResolver, Resolver};
pub use specifier::is_ignored;
pub use token::{LoadResult, Token};
pub use transform::{DefaultTransformer, Dep, Transformer, TransformContext, TransformOutcome};

use cache::Cache;

/// Construction options for a [`Locator`]. All fields are optional; when omitted the built-in
/// filesystem resolver and extension-dispatched transformer are used.
#[derive(Default, Clone)]
pub struct LocatorOptions {
    pub transformer: Option<Arc<dyn Transformer>>,
    pub resolver: Option<Arc<dyn Resolver>>,
}

/// The CSS Modules token locator. Not safe for overlapping top-level loads on the same instance
/// (§4.H); construct one per concurrent consumer if that's needed, or serialize calls yourself.
pub struct Locator {
    resolver: Arc<dyn Resolver>,
    transformer: Arc<dyn Transformer>,
    cache: Mutex<Cache>,
    in_flight: AtomicBool,
}

impl Locator {
    pub fn new(options: LocatorOptions) -> Self {
        Locator {
            resolver: options.resolver.unwrap_or_else(|| Arc::new(DefaultResolver)),
            transformer: transform::effective_transformer(&options.transformer),
            cache: Mutex::new(Cache::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Resolves, parses and recursively loads the token graph rooted at `file_path`, which must
    /// be absolute. Rejects a second call while one is already in flight on this instance
    /// (§4.H) — see [`LoadError::ConcurrentLoad`].
    #[instrument(level = "debug", skip(self), fields(file = %file_path.display()))]
    pub async fn load(&self, file_path: &Path) -> error::Result<LoadResult> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LoadError::ConcurrentLoad);
        }
        let _guard = InFlightGuard { locator: self };

        engine::load_recursive(self, file_path).await
    }
}

impl Default for Locator {
    fn default() -> Self {
        Locator::new(LocatorOptions::default())
    }
}

/// Clears the in-flight flag on both the success and failure paths of a top-level `load`. Rust's
/// drop semantics give this guarantee even if the caller drops the future mid-`.await` —
/// something the original's `try`/`finally` couldn't offer under unstructured JS cancellation.
struct InFlightGuard<'a> {
    locator: &'a Locator,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.locator.in_flight.store(false, Ordering::Release);
    }
}
