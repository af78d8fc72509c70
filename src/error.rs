use std::path::PathBuf;

/// The closed set of failures a [`crate::Locator::load`] call can surface.
///
/// No error is ever recovered inside the locator: a single member of this enum aborts the whole
/// load and is handed back to the caller verbatim.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{}:{line}:{column}: {message}", file.display())]
    Syntax {
        file: PathBuf,
        line: u32,
        column: u32,
        message: String,
    },

    #[error("could not resolve {specifier:?} from {}", request.display())]
    Resolution { specifier: String, request: PathBuf },

    #[error(
        "{} depends on non-file specifier with protocol {protocol:?}",
        dependency_of.display()
    )]
    UnsupportedProtocol {
        protocol: String,
        dependency_of: PathBuf,
    },

    #[error("a load is already in flight on this locator")]
    ConcurrentLoad,

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LoadError>;
