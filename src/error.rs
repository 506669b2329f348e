//! Error types for content loading and page rendering

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A malformed metadata block at the top of a post
#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("missing opening `---` delimiter")]
    MissingOpening,

    #[error("missing closing `---` delimiter")]
    MissingClosing,

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("metadata block is not a key-value mapping")]
    NotAMapping,

    #[error("missing required key `{0}`")]
    MissingKey(&'static str),

    #[error("key `{0}` must hold a scalar value")]
    NotScalar(&'static str),
}

/// Failures while listing or reading post sources
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("content directory {path:?} cannot be read: {source}")]
    MissingDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list {path:?}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed frontmatter in {path:?}: {source}")]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },

    #[error("slug `{slug}` of {path:?} is already taken")]
    DuplicateSlug { slug: String, path: PathBuf },
}

/// Failures while turning a compiled tree into HTML
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to highlight code block: {0}")]
    Highlight(#[from] syntect::Error),
}

/// Top-level error for page generation
#[derive(Error, Debug)]
pub enum BlogError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("no post with slug `{0}`")]
    NotFound(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode route manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl BlogError {
    /// Whether this error means the requested page does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlogError::NotFound(_))
    }
}
