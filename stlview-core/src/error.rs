/// Error types for viewer configuration, asset loading and rendering
use thiserror::Error;

/// A required attribute is missing or malformed. Fatal to a mount.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{0} attribute is required")]
    MissingAttribute(&'static str),

    #[error("color must be a hex value like #rrggbb or 0xrrggbb, got {0:?}")]
    MalformedColor(String),
}

/// STL decoding failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StlError {
    #[error("file too small to be a valid STL ({0} bytes)")]
    TooSmall(usize),

    #[error("unexpected end of file in facet {facet} of {expected}")]
    Truncated { facet: usize, expected: usize },

    #[error("failed to parse ASCII STL: {0}")]
    Ascii(String),
}

/// The mesh asset could not be turned into geometry. Fatal to the session.
#[derive(Error, Debug)]
pub enum AssetLoadError {
    #[error("failed to fetch {source_uri}: {reason}")]
    Fetch { source_uri: String, reason: String },

    #[error("failed to parse {source_uri}: {source}")]
    Parse {
        source_uri: String,
        #[source]
        source: StlError,
    },

    #[error("{source_uri} contains no triangles")]
    EmptyGeometry { source_uri: String },
}

/// The host could not provide a render surface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("host error: {0}")]
pub struct HostError(pub String);

/// A render surface failed to present a frame
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("surface error: {0}")]
    Surface(String),
}

/// Any failure surfaced by the viewer lifecycle
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    AssetLoad(#[from] AssetLoadError),
}
