//! Post model

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::{FrontMatter, PostFile};
use crate::error::ContentError;
use crate::helpers::post_href;

/// A blog post read from disk
#[derive(Debug, Clone, Serialize)]
pub struct PostRecord {
    /// Slug (file name without extension), the routing key
    pub slug: String,

    /// Full source file path
    #[serde(skip)]
    pub source: PathBuf,

    pub front_matter: FrontMatter,

    /// Raw markdown body after the metadata block
    #[serde(skip)]
    pub body: String,
}

impl PostRecord {
    /// Read and split a listed post file
    pub fn load(file: &PostFile) -> Result<Self, ContentError> {
        Self::read(&file.slug, &file.path)
    }

    /// Read and split the post at `path`
    pub fn read(slug: &str, path: &Path) -> Result<Self, ContentError> {
        let raw = fs::read_to_string(path).map_err(|source| ContentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_source(slug, path, &raw)
    }

    /// Build a record from raw file text
    pub fn from_source(slug: &str, path: &Path, raw: &str) -> Result<Self, ContentError> {
        let (front_matter, body) =
            FrontMatter::parse(raw).map_err(|source| ContentError::FrontMatter {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            slug: slug.to_string(),
            source: path.to_path_buf(),
            front_matter,
            body: body.to_string(),
        })
    }

    pub fn title(&self) -> &str {
        &self.front_matter.title
    }

    /// Route of this post's page
    pub fn href(&self) -> String {
        post_href(&self.slug)
    }
}
