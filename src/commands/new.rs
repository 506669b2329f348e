//! Create a new post

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::content::FrontMatter;
use crate::Blog;

/// Cover used when none is given on the command line
const DEFAULT_COVER: &str = "/images/cover.png";

/// Scaffold a post file named after the slugified title
pub fn create_post(blog: &Blog, title: &str, cover_image: Option<&str>) -> Result<PathBuf> {
    let slug = slug::slugify(title);
    if slug.is_empty() {
        anyhow::bail!("Title {:?} does not produce a usable slug", title);
    }

    fs::create_dir_all(&blog.content_dir)?;
    let file_path = blog
        .content_dir
        .join(format!("{}.{}", slug, blog.config.extension));

    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let today = chrono::Local::now().format("%Y-%m-%d");
    let content = format!(
        "---\ntitle: {}\ndate: {}\ncover_image: {}\n---\n\n",
        yaml_string(title),
        today,
        yaml_string(cover_image.unwrap_or(DEFAULT_COVER)),
    );

    // Never write a file the build would reject
    FrontMatter::parse(&content)?;

    fs::write(&file_path, content)?;
    tracing::info!("Created: {:?}", file_path);

    Ok(file_path)
}

/// Quote a value as a YAML double-quoted scalar
fn yaml_string(value: &str) -> String {
    format!(
        "\"{}\"",
        value.replace('\\', "\\\\").replace('"', "\\\"")
    )
}
