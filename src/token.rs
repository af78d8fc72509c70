use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::location::Location;

/// An identifier exported by a CSS Modules sheet: a local class name or an `@value` binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// The name exposed to the consumer.
    pub name: String,
    /// Set only when this token is re-exported under an alias, i.e. `@value alias from "...";`
    /// where `alias` differs from the name it was declared under in the source sheet.
    pub imported_name: Option<String>,
    /// The definition site in the *defining* sheet, never the importing sheet.
    pub original_location: Location,
}

impl Token {
    pub fn new(name: impl Into<String>, original_location: Location) -> Self {
        Token {
            name: name.into(),
            imported_name: None,
            original_location,
        }
    }

    pub fn with_imported_name(mut self, imported_name: impl Into<String>) -> Self {
        self.imported_name = Some(imported_name.into());
        self
    }
}

/// The result of loading one stylesheet and everything it transitively reaches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadResult {
    /// Absolute paths this sheet transitively depends on, excluding the sheet itself.
    /// Insertion-order, de-duplicated.
    pub dependencies: Vec<PathBuf>,
    /// De-duplicated by full structural equality (name + imported_name + location).
    pub tokens: Vec<Token>,
}

impl LoadResult {
    /// Appends `dep` (and, transitively, nothing else — callers flatten before calling this) if
    /// it isn't already present and isn't `own_path`.
    pub(crate) fn push_dependency(&mut self, dep: PathBuf, own_path: &std::path::Path) {
        if dep != own_path && !self.dependencies.contains(&dep) {
            self.dependencies.push(dep);
        }
    }

    pub(crate) fn push_token(&mut self, token: Token) {
        if !self.tokens.contains(&token) {
            self.tokens.push(token);
        }
    }

    pub(crate) fn finalize(&mut self, own_path: &std::path::Path) {
        self.dependencies.retain(|dep| dep != own_path);
    }
}
