//! Built-in page templates using the Tera template engine
//!
//! The layout shell, home page, post page and not-found page are embedded
//! in the binary.

use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::helpers::html_escape;

/// Template renderer with the embedded blog templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> tera::Result<Self> {
        let mut tera = Tera::default();

        // Hrefs must reach the page untouched; text is escaped with the
        // html_escape filter instead
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("blog/layout.html")),
            ("index.html", include_str!("blog/index.html")),
            ("post.html", include_str!("blog/post.html")),
            ("404.html", include_str!("blog/404.html")),
            (
                "partials/card.html",
                include_str!("blog/partials/card.html"),
            ),
        ])?;

        tera.register_filter("html_escape", html_escape_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> tera::Result<String> {
        self.tera.render(template_name, context)
    }
}

/// Tera filter: escape HTML special characters
fn html_escape_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("html_escape", "value", String, value);
    Ok(tera::Value::String(html_escape(&s)))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub url: String,
}

impl From<&SiteConfig> for SiteData {
    fn from(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            url: config.url.clone(),
        }
    }
}

/// One entry on the home page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub slug: String,
    pub title: String,
    pub cover_image: String,
    pub date: String,
    pub href: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPageData {
    pub slug: String,
    pub title: String,
    /// Display form of the frontmatter date
    pub date: String,
    pub cover_image: String,
    /// Rendered HTML body
    pub content: String,
}
