//! Generator module - renders the home page and post pages to static HTML

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tera::Context;
use walkdir::WalkDir;

use crate::config::PostOrder;
use crate::content::{ContentLister, MarkdownRenderer, PostRecord};
use crate::error::{BlogError, ContentError};
use crate::helpers::post_href;
use crate::templates::{CardView, PostPageData, SiteData, TemplateRenderer};
use crate::Blog;

/// Name of the route manifest written next to the pages
pub const ROUTES_FILE: &str = "routes.json";

/// The fixed set of routes produced by one build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteManifest {
    pub routes: Vec<String>,
}

impl RouteManifest {
    /// Routes for the home page plus one page per slug
    pub fn from_slugs(slugs: &[String]) -> Self {
        let mut routes = Vec::with_capacity(slugs.len() + 1);
        routes.push("/".to_string());
        routes.extend(slugs.iter().map(|slug| post_href(slug)));
        Self { routes }
    }

    pub fn contains(&self, route: &str) -> bool {
        self.routes.iter().any(|r| r == route)
    }

    /// Read the manifest from a generated output directory
    pub fn load(public_dir: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(public_dir.join(ROUTES_FILE))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// What one full generation produced
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateSummary {
    pub posts: usize,
    pub assets: usize,
    pub routes: RouteManifest,
}

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    lister: ContentLister,
    renderer: TemplateRenderer,
    markdown: MarkdownRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self, BlogError> {
        let lister = ContentLister::new(&blog.content_dir, &blog.config.extension);
        let renderer = TemplateRenderer::new()?;
        let markdown = MarkdownRenderer::new(&blog.config.highlight);

        Ok(Self {
            blog: blog.clone(),
            lister,
            renderer,
            markdown,
        })
    }

    /// Every slug that gets a page; nothing outside this set is generated
    pub fn static_paths(&self) -> Result<Vec<String>, BlogError> {
        Ok(self.lister.slugs()?)
    }

    /// Read and split every post, in listing order.
    ///
    /// Files are read in parallel; the first failure aborts the load.
    pub fn load_posts(&self) -> Result<Vec<PostRecord>, BlogError> {
        let files = self.lister.files()?;
        let posts = files
            .par_iter()
            .map(PostRecord::load)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    /// Card views for the home page, in the configured order
    pub fn card_views(&self, posts: &[PostRecord]) -> Vec<CardView> {
        let mut ordered: Vec<&PostRecord> = posts.iter().collect();
        match self.blog.config.order_by {
            PostOrder::Listing => {}
            PostOrder::Date => ordered.sort_by(|a, b| newest_first(a, b)),
            PostOrder::Title => ordered.sort_by(|a, b| a.title().cmp(b.title())),
        }

        ordered
            .into_iter()
            .map(|post| CardView {
                slug: post.slug.clone(),
                title: post.front_matter.title.clone(),
                cover_image: post.front_matter.cover_image.clone(),
                date: post.front_matter.date.clone(),
                href: post.href(),
            })
            .collect()
    }

    /// Render the home page from freshly loaded posts
    pub fn render_index(&self) -> Result<String, BlogError> {
        let posts = self.load_posts()?;
        self.render_index_from(&posts)
    }

    /// Render the home page for already loaded posts
    pub fn render_index_from(&self, posts: &[PostRecord]) -> Result<String, BlogError> {
        let cards = self.card_views(posts);

        let mut context = self.base_context();
        context.insert("cards", &cards);
        Ok(self.renderer.render("index.html", &context)?)
    }

    /// Render the page of one post.
    ///
    /// Slugs outside the enumerated set are `BlogError::NotFound`.
    pub fn render_post(&self, slug: &str) -> Result<String, BlogError> {
        if !self.static_paths()?.iter().any(|s| s == slug) {
            return Err(BlogError::NotFound(slug.to_string()));
        }

        let post = PostRecord::read(slug, &self.lister.path_for(slug))?;
        self.render_post_record(&post)
    }

    fn render_post_record(&self, post: &PostRecord) -> Result<String, BlogError> {
        let content = self.markdown.render(&post.body)?;
        let page = PostPageData {
            slug: post.slug.clone(),
            title: post.front_matter.title.clone(),
            date: post.front_matter.display_date(),
            cover_image: post.front_matter.cover_image.clone(),
            content,
        };

        let mut context = self.base_context();
        context.insert("post", &page);
        Ok(self.renderer.render("post.html", &context)?)
    }

    /// Render the page served for unknown routes
    pub fn render_not_found(&self) -> Result<String, BlogError> {
        Ok(self.renderer.render("404.html", &self.base_context())?)
    }

    /// Generate the entire site.
    ///
    /// Every post is loaded and validated before anything is written.
    pub fn generate(&self) -> Result<GenerateSummary, BlogError> {
        let slugs = self.static_paths()?;
        let posts = self.load_posts()?;

        let public_dir = &self.blog.public_dir;
        create_dir(public_dir)?;
        self.clear_post_pages()?;

        let assets = self.copy_static_assets()?;

        let index = self.render_index_from(&posts)?;
        write_page(&public_dir.join("index.html"), &index)?;

        // Each page re-reads its source, as a single-page render would
        for slug in &slugs {
            let post = PostRecord::read(slug, &self.lister.path_for(slug))?;
            let html = self.render_post_record(&post)?;
            let output_path = self.post_output_path(slug);
            write_page(&output_path, &html)?;
            tracing::debug!("Generated post: {:?}", output_path);
        }

        let not_found = self.render_not_found()?;
        write_page(&public_dir.join("404.html"), &not_found)?;

        let routes = RouteManifest::from_slugs(&slugs);
        let json = serde_json::to_string_pretty(&routes)?;
        write_page(&public_dir.join(ROUTES_FILE), &json)?;

        tracing::info!(
            "Generated {} post pages and {} routes",
            slugs.len(),
            routes.routes.len()
        );

        Ok(GenerateSummary {
            posts: posts.len(),
            assets,
            routes,
        })
    }

    /// Output file of a post page
    pub fn post_output_path(&self, slug: &str) -> PathBuf {
        self.blog
            .public_dir
            .join("posts")
            .join(slug)
            .join("index.html")
    }

    /// Remove post pages left by an earlier build so only current slugs are served
    fn clear_post_pages(&self) -> Result<(), BlogError> {
        let posts_dir = self.blog.public_dir.join("posts");
        if !posts_dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&posts_dir).map_err(|source| BlogError::Write {
            path: posts_dir.clone(),
            source,
        })?;
        tracing::debug!("Cleared {:?}", posts_dir);
        Ok(())
    }

    /// Copy the static directory (cover images etc.) into the output
    fn copy_static_assets(&self) -> Result<usize, BlogError> {
        let static_dir = &self.blog.static_dir;
        if !static_dir.is_dir() {
            return Ok(0);
        }

        let mut copied = 0;
        for entry in WalkDir::new(static_dir).follow_links(true) {
            let entry = entry.map_err(|source| ContentError::Walk {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| static_dir.clone()),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(static_dir) else {
                continue;
            };

            let dest = self.blog.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                create_dir(parent)?;
            }
            fs::copy(path, &dest).map_err(|source| BlogError::Write {
                path: dest.clone(),
                source,
            })?;
            copied += 1;
        }

        tracing::debug!("Copied {} static files", copied);
        Ok(copied)
    }

    /// Create a base context with common variables
    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &SiteData::from(&self.blog.config));
        context
    }
}

/// Newest first; posts without a recognizable date go last
fn newest_first(a: &PostRecord, b: &PostRecord) -> Ordering {
    match (a.front_matter.parse_date(), b.front_matter.parse_date()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn create_dir(path: &Path) -> Result<(), BlogError> {
    fs::create_dir_all(path).map_err(|source| BlogError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_page(path: &Path, content: &str) -> Result<(), BlogError> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    fs::write(path, content).map_err(|source| BlogError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::helpers::strip_html;
    use tempfile::TempDir;

    fn post_source(title: &str, date: &str) -> String {
        format!(
            "---\ntitle: {}\ndate: {}\ncover_image: /images/{}.png\n---\n\nBody of {}.\n",
            title,
            date,
            title.to_lowercase(),
            title
        )
    }

    fn site_with(config: SiteConfig, posts: &[(&str, String)]) -> (TempDir, Blog) {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::with_config(dir.path(), config);
        fs::create_dir_all(&blog.content_dir).unwrap();
        for (name, content) in posts {
            fs::write(blog.content_dir.join(name), content).unwrap();
        }
        (dir, blog)
    }

    fn site(posts: &[(&str, String)]) -> (TempDir, Blog) {
        site_with(SiteConfig::default(), posts)
    }

    #[test]
    fn test_static_paths() {
        let (_dir, blog) = site(&[
            ("first.mdx", post_source("First", "2024-01-01")),
            ("second.mdx", post_source("Second", "2024-02-01")),
            ("draft.txt", "not a post".to_string()),
        ]);
        let generator = Generator::new(&blog).unwrap();

        assert_eq!(generator.static_paths().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_index_has_one_card_per_post() {
        let names = ["a.mdx", "b.mdx", "c.mdx"];
        let posts: Vec<_> = names
            .iter()
            .map(|n| (*n, post_source(n.trim_end_matches(".mdx"), "2024-01-01")))
            .collect();
        let (_dir, blog) = site(&posts);
        let generator = Generator::new(&blog).unwrap();

        let html = generator.render_index().unwrap();
        assert_eq!(html.matches(r#"class="post-card""#).count(), names.len());
        for slug in ["a", "b", "c"] {
            assert!(html.contains(&format!(r#"href="/posts/{}""#, slug)));
        }
    }

    #[test]
    fn test_card_views_follow_listing_order() {
        let (_dir, blog) = site(&[
            ("old.mdx", post_source("Old", "2020-01-01")),
            ("new.mdx", post_source("New", "2024-01-01")),
        ]);
        let generator = Generator::new(&blog).unwrap();
        let posts = generator.load_posts().unwrap();

        let cards = generator.card_views(&posts);
        let slugs: Vec<_> = cards.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["new", "old"]);
        assert_eq!(cards[0].href, "/posts/new");
        assert_eq!(cards[0].cover_image, "/images/new.png");
    }

    #[test]
    fn test_card_views_by_date() {
        let config = SiteConfig {
            order_by: PostOrder::Date,
            ..Default::default()
        };
        let (_dir, blog) = site_with(
            config,
            &[
                ("a.mdx", post_source("A", "2021-06-01")),
                ("b.mdx", post_source("B", "someday")),
                ("c.mdx", post_source("C", "2023-06-01")),
            ],
        );
        let generator = Generator::new(&blog).unwrap();
        let posts = generator.load_posts().unwrap();

        let slugs: Vec<_> = generator
            .card_views(&posts)
            .into_iter()
            .map(|c| c.slug)
            .collect();
        assert_eq!(slugs, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_render_post_round_trip() {
        let (_dir, blog) = site(&[(
            "t.mdx",
            "---\ntitle: \"T\"\ndate: \"D\"\ncover_image: \"/x.png\"\n---\nhello".to_string(),
        )]);
        let generator = Generator::new(&blog).unwrap();

        let post = &generator.load_posts().unwrap()[0];
        assert_eq!(post.front_matter.title, "T");
        assert_eq!(post.front_matter.date, "D");
        assert_eq!(post.front_matter.cover_image, "/x.png");

        let html = generator.render_post("t").unwrap();
        assert!(strip_html(&html).contains("hello"));
        assert!(html.contains(r#"src="/x.png""#));
    }

    #[test]
    fn test_render_post_highlights_code() {
        let (_dir, blog) = site(&[(
            "code.mdx",
            "---\ntitle: Code\ndate: 2024-01-01\ncover_image: /c.png\n---\n\n```js\nconst a = 1;\n```\n"
                .to_string(),
        )]);
        let generator = Generator::new(&blog).unwrap();

        let html = generator.render_post("code").unwrap();
        assert!(html.contains(r#"class="highlight language-js""#));
        assert!(html.contains("January 01, 2024"));
    }

    #[test]
    fn test_unknown_slug_is_not_found() {
        let (_dir, blog) = site(&[("real.mdx", post_source("Real", "2024-01-01"))]);
        let generator = Generator::new(&blog).unwrap();

        for slug in ["missing", "../real", "real.mdx", ""] {
            let err = generator.render_post(slug).unwrap_err();
            assert!(err.is_not_found(), "{slug:?} gave {err}");
        }
    }

    #[test]
    fn test_malformed_post_fails_build() {
        let (_dir, blog) = site(&[
            ("good.mdx", post_source("Good", "2024-01-01")),
            (
                "bad.mdx",
                "---\ntitle: Bad\ndate: 2024-01-01\ncover_image: /b.png\n\nno closing".to_string(),
            ),
        ]);
        let generator = Generator::new(&blog).unwrap();

        let err = generator.generate().unwrap_err();
        assert!(matches!(
            err,
            BlogError::Content(ContentError::FrontMatter { .. })
        ));
        assert!(!blog.public_dir.join("index.html").exists());
    }

    #[test]
    fn test_missing_content_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::with_config(dir.path(), SiteConfig::default());
        let generator = Generator::new(&blog).unwrap();

        let err = generator.generate().unwrap_err();
        assert!(matches!(
            err,
            BlogError::Content(ContentError::MissingDir { .. })
        ));
    }

    #[test]
    fn test_generate_writes_pages_and_routes() {
        let (_dir, blog) = site(&[
            ("first.mdx", post_source("First", "2024-01-01")),
            ("second.mdx", post_source("Second", "2024-02-01")),
        ]);
        fs::create_dir_all(blog.static_dir.join("images")).unwrap();
        fs::write(blog.static_dir.join("images/first.png"), b"png").unwrap();
        let generator = Generator::new(&blog).unwrap();

        let summary = generator.generate().unwrap();
        assert_eq!(summary.posts, 2);
        assert_eq!(summary.assets, 1);
        assert_eq!(
            summary.routes.routes,
            vec!["/", "/posts/first", "/posts/second"]
        );

        assert!(blog.public_dir.join("index.html").is_file());
        assert!(blog.public_dir.join("404.html").is_file());
        assert!(blog.public_dir.join("images/first.png").is_file());
        let page = fs::read_to_string(generator.post_output_path("second")).unwrap();
        assert!(page.contains("Body of Second."));

        let manifest = RouteManifest::load(&blog.public_dir).unwrap();
        assert_eq!(manifest, summary.routes);
        assert!(manifest.contains("/posts/first"));
        assert!(!manifest.contains("/posts/third"));
    }

    #[test]
    fn test_regenerate_drops_deleted_posts() {
        let (_dir, blog) = site(&[
            ("a.mdx", post_source("A", "2024-01-01")),
            ("b.mdx", post_source("B", "2024-01-02")),
        ]);
        Generator::new(&blog).unwrap().generate().unwrap();
        let generator = Generator::new(&blog).unwrap();
        assert!(generator.post_output_path("b").is_file());

        fs::remove_file(blog.content_dir.join("b.mdx")).unwrap();
        let summary = generator.generate().unwrap();

        assert_eq!(summary.routes.routes, vec!["/", "/posts/a"]);
        assert!(generator.post_output_path("a").is_file());
        assert!(!generator.post_output_path("b").exists());
        assert!(!blog.public_dir.join("posts/b").exists());
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_pages() {
        let (_dir, blog) = site(&[("a.mdx", post_source("A", "2024-01-01"))]);
        let generator = Generator::new(&blog).unwrap();
        generator.generate().unwrap();

        fs::write(blog.content_dir.join("a.mdx"), "---\ntitle: A\n").unwrap();
        assert!(generator.generate().is_err());
        assert!(generator.post_output_path("a").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_static_asset_fails_build() {
        let (_dir, blog) = site(&[("a.mdx", post_source("A", "2024-01-01"))]);
        fs::create_dir_all(&blog.static_dir).unwrap();
        fs::write(blog.static_dir.join("ok.png"), b"png").unwrap();
        std::os::unix::fs::symlink(
            blog.static_dir.join("missing.png"),
            blog.static_dir.join("cover.png"),
        )
        .unwrap();
        let generator = Generator::new(&blog).unwrap();

        let err = generator.generate().unwrap_err();
        match err {
            BlogError::Content(ContentError::Walk { path, .. }) => {
                assert!(path.ends_with("cover.png"), "{path:?}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
