//! Generate static files

use anyhow::Result;
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use crate::generator::{GenerateSummary, Generator};
use crate::Blog;

/// Generate the static site
pub fn run(blog: &Blog) -> Result<()> {
    generate(blog)?;
    Ok(())
}

/// Generate the static site and report what was written
pub fn generate(blog: &Blog) -> Result<GenerateSummary> {
    let start = Instant::now();

    let generator = Generator::new(blog)?;
    let summary = generator.generate()?;

    tracing::info!(
        "Generated {} posts into {:?} in {:.2}s",
        summary.posts,
        blog.public_dir,
        start.elapsed().as_secs_f64()
    );

    Ok(summary)
}

/// Watch for source changes and regenerate until the watcher stops
pub async fn watch(blog: &Blog) -> Result<()> {
    tracing::info!("Watching {:?} for changes. Press Ctrl+C to stop.", blog.content_dir);

    let blog = blog.clone();
    // The debouncer blocks on a std channel, keep it off the runtime workers
    tokio::task::spawn_blocking(move || watch_sources(&blog, || {})).await?
}

/// Block on source changes, regenerating once per debounced batch.
///
/// `on_rebuild` runs after every successful generation.
pub fn watch_sources<F: FnMut()>(blog: &Blog, mut on_rebuild: F) -> Result<()> {
    let (tx, rx) = channel();

    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    debouncer
        .watcher()
        .watch(&blog.content_dir, RecursiveMode::NonRecursive)?;
    tracing::debug!("Watching: {:?}", blog.content_dir);

    if blog.static_dir.exists() {
        debouncer
            .watcher()
            .watch(&blog.static_dir, RecursiveMode::Recursive)?;
        tracing::debug!("Watching: {:?}", blog.static_dir);
    }

    let config_path = blog.config_path();
    if config_path.exists() {
        debouncer
            .watcher()
            .watch(&config_path, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching: {:?}", config_path);
    }

    for result in rx {
        match result {
            Ok(events) => {
                let changed: Vec<_> = events
                    .iter()
                    .filter(|e| is_source_change(&e.path))
                    .collect();
                if changed.is_empty() {
                    continue;
                }

                for event in &changed {
                    tracing::info!("File changed: {}", event.path.display());
                }

                match reload(blog).and_then(|blog| run(&blog)) {
                    Ok(()) => on_rebuild(),
                    Err(e) => tracing::error!("Generation failed: {:#}", e),
                }
            }
            Err(e) => tracing::error!("Watch error: {:?}", e),
        }
    }

    Ok(())
}

/// Editor droppings do not trigger a rebuild
fn is_source_change(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    !path_str.contains(".DS_Store") && !path_str.ends_with('~')
}

/// Re-read the site configuration so edits to it take effect
pub fn reload(blog: &Blog) -> Result<Blog> {
    Blog::new(&blog.base_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_generate_command() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        fs::create_dir_all(&blog.content_dir).unwrap();
        fs::write(
            blog.content_dir.join("hello.mdx"),
            "---\ntitle: Hello\ndate: 2024-01-01\ncover_image: /h.png\n---\nHi there\n",
        )
        .unwrap();

        let summary = generate(&blog).unwrap();
        assert_eq!(summary.posts, 1);
        assert!(blog.public_dir.join("posts/hello/index.html").is_file());
    }

    #[test]
    fn test_generate_command_without_content_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::new(dir.path()).unwrap();

        let err = run(&blog).unwrap_err();
        assert!(err.to_string().contains("content directory"));
    }

    #[test]
    fn test_reload_picks_up_config_changes() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        fs::write(blog.config_path(), "title: Renamed\n").unwrap();

        let reloaded = reload(&blog).unwrap();
        assert_eq!(reloaded.config.title, "Renamed");
    }

    #[test]
    fn test_editor_droppings_are_ignored() {
        assert!(is_source_change(Path::new("pages/posts/hello.mdx")));
        assert!(!is_source_change(Path::new("pages/posts/hello.mdx~")));
        assert!(!is_source_change(Path::new("static/.DS_Store")));
    }
}
