//! The local token enumerator (§4.E).
//!
//! CSS-Modules "local" semantics — a class selector is a local export unless it is reached
//! exclusively through `:global(...)` — is exactly what lightningcss's own CSS Modules export
//! pass computes when [`lightningcss::css_modules::Config`] is supplied at parse time. Rather
//! than re-walking the selector list ourselves we read the keys of that exports map, reusing the
//! standard CSS-Modules plug-in pipeline instead of reimplementing it.
//!
//! Known false positive, inherited from the upstream pipeline and accepted as-is: a name that is
//! local in one rule and `:global`-referenced elsewhere in the same sheet is still reported local.

use std::collections::HashSet;

use lightningcss::css_modules::{CssModuleExports, CssModuleReference};

pub(crate) fn enumerate(exports: Option<CssModuleExports>) -> HashSet<String> {
    exports.map(|e| e.into_keys().collect()).unwrap_or_default()
}

/// Specifiers reached through `composes: … from "./other.css"` across every export, de-duplicated
/// and in first-seen order. `composes` resolves to another sheet's class but never mints a token
/// of its own — it's traced purely as a dependency edge (§1, §8 scenario 2).
pub(crate) fn composes_specifiers(exports: Option<&CssModuleExports>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut specifiers = Vec::new();
    let Some(exports) = exports else {
        return specifiers;
    };
    for export in exports.values() {
        for reference in &export.composes {
            if let CssModuleReference::Dependency { specifier, .. } = reference {
                if seen.insert(specifier.clone()) {
                    specifiers.push(specifier.clone());
                }
            }
        }
    }
    specifiers
}
