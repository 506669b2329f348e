//! Content lister - enumerates post sources in the content directory

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::ContentError;

/// A post source file and the slug derived from its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFile {
    pub slug: String,
    pub path: PathBuf,
}

/// Lists post sources in one directory, without recursing
#[derive(Debug, Clone)]
pub struct ContentLister {
    dir: PathBuf,
    extension: String,
}

impl ContentLister {
    /// Create a lister for `dir`, matching files ending in `.{extension}`
    pub fn new<P: AsRef<Path>>(dir: P, extension: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// The listed directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Start a fresh pass over the directory.
    ///
    /// Entries are read lazily; calling this again re-reads the directory.
    pub fn iter(&self) -> Result<PostFiles, ContentError> {
        let is_dir = fs::metadata(&self.dir).and_then(|meta| {
            if meta.is_dir() {
                Ok(())
            } else {
                Err(io::Error::other("not a directory"))
            }
        });
        if let Err(source) = is_dir {
            return Err(ContentError::MissingDir {
                path: self.dir.clone(),
                source,
            });
        }

        let walker = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        Ok(PostFiles {
            walker,
            extension: self.extension.clone(),
        })
    }

    /// All post files, rejecting duplicate slugs
    pub fn files(&self) -> Result<Vec<PostFile>, ContentError> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for file in self.iter()? {
            let file = file?;
            if !seen.insert(file.slug.clone()) {
                return Err(ContentError::DuplicateSlug {
                    slug: file.slug,
                    path: file.path,
                });
            }
            files.push(file);
        }

        Ok(files)
    }

    /// Every slug that has a page, in listing order
    pub fn slugs(&self) -> Result<Vec<String>, ContentError> {
        Ok(self.files()?.into_iter().map(|f| f.slug).collect())
    }

    /// Source path a slug would be read from
    pub fn path_for(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", slug, self.extension))
    }
}

/// One pass over a content directory
pub struct PostFiles {
    walker: walkdir::IntoIter,
    extension: String,
}

impl Iterator for PostFiles {
    type Item = Result<PostFile, ContentError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(source) => {
                    let path = source.path().map(Path::to_path_buf).unwrap_or_default();
                    return Some(Err(ContentError::Walk { path, source }));
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if let Some(slug) = slug_for(path, &self.extension) {
                return Some(Ok(PostFile {
                    slug,
                    path: path.to_path_buf(),
                }));
            }
        }
    }
}

/// Slug of a content file, or None if the extension does not match
fn slug_for(path: &Path, extension: &str) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if ext != extension {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}
