//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,

    // URL
    pub url: String,

    // Directory
    pub content_dir: String,
    pub public_dir: String,

    // Writing
    /// Extension of post source files, without the leading dot
    pub extension: String,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Home page
    pub order_by: PostOrder,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Dev - Pubudu Blog".to_string(),
            description: String::new(),
            author: String::new(),

            url: "http://localhost:4000".to_string(),

            content_dir: "pages/posts".to_string(),
            public_dir: "public".to_string(),

            extension: "mdx".to_string(),
            highlight: HighlightConfig::default(),

            order_by: PostOrder::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Ordering of the cards on the home page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostOrder {
    /// Whatever order the directory listing returns
    #[default]
    Listing,
    /// Newest first, by the `date` frontmatter key
    Date,
    /// Alphabetical by title
    Title,
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Name of a syntect default theme
    pub theme: String,
    pub line_numbers: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            line_numbers: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.content_dir, "pages/posts");
        assert_eq!(config.extension, "mdx");
        assert_eq!(config.order_by, PostOrder::Listing);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
content_dir: posts
extension: md
order_by: date
highlight:
  theme: InspiredGitHub
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.content_dir, "posts");
        assert_eq!(config.extension, "md");
        assert_eq!(config.order_by, PostOrder::Date);
        assert_eq!(config.highlight.theme, "InspiredGitHub");
        assert!(!config.highlight.line_numbers);
        assert_eq!(config.public_dir, "public");
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_config.yml");
        fs::write(&path, "author: Pubudu\norder_by: title\n").unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.author, "Pubudu");
        assert_eq!(config.order_by, PostOrder::Title);
    }
}
