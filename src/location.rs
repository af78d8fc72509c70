use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A point in an original (pre-transform) source file.
///
/// `line` is 1-based, `column` is 0-based, matching the convention the rest of the CSS Modules
/// toolchain (and most source map consumers) expect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file_path: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file_path: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Location {
            file_path: file_path.into(),
            line,
            column,
        }
    }

    /// Builds a `Location` from a lightningcss `Location`, which is always relative to the
    /// transformed (post-preprocessor) file and 1-based in both line and column.
    pub(crate) fn from_lightningcss(loc: lightningcss::dependencies::Location, from: &Path) -> Self {
        Location {
            file_path: from.to_path_buf(),
            line: loc.line + 1,
            column: loc.column.saturating_sub(1),
        }
    }
}

/// Resolves a position in the transformed output back to a position in the original source,
/// using a preprocessor-supplied source map when one is available.
///
/// Built once per [`crate::engine`] load and threaded through the AST collector, keeping position
/// lookup an explicit, testable seam rather than inlining it into the parser.
pub(crate) struct PositionMapper {
    map: Option<parcel_sourcemap::SourceMap>,
    fallback_file: PathBuf,
}

impl PositionMapper {
    pub fn new(map: Option<parcel_sourcemap::SourceMap>, fallback_file: PathBuf) -> Self {
        PositionMapper { map, fallback_file }
    }

    /// Translates a 1-based line / 0-based column position in the transformed output into a
    /// [`Location`] in the original source.
    pub fn resolve(&self, line: u32, column: u32) -> Location {
        let Some(map) = &self.map else {
            return Location::new(self.fallback_file.clone(), line, column);
        };
        // parcel_sourcemap positions are 0-based in both line and column.
        match map.find_closest_mapping(line.saturating_sub(1), column) {
            Some(mapping) => {
                let source = mapping
                    .original
                    .and_then(|orig| map.get_source(orig.source).ok())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| self.fallback_file.clone());
                let orig = mapping.original.unwrap_or_default();
                Location::new(source, orig.original_line + 1, orig.original_column)
            }
            None => Location::new(self.fallback_file.clone(), line, column),
        }
    }
}
