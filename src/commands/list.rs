//! List site content

use anyhow::Result;
use serde::Serialize;

use crate::generator::Generator;
use crate::helpers::full_url_for;
use crate::Blog;

/// One row of `devblog list`
#[derive(Debug, Clone, Serialize)]
pub struct ListedPost {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub cover_image: String,
    pub url: String,
}

/// Collect posts in home page order
pub fn collect(blog: &Blog) -> Result<Vec<ListedPost>> {
    let generator = Generator::new(blog)?;
    let posts = generator.load_posts()?;

    Ok(generator
        .card_views(&posts)
        .into_iter()
        .map(|card| ListedPost {
            url: full_url_for(&blog.config, &card.href),
            slug: card.slug,
            title: card.title,
            date: card.date,
            cover_image: card.cover_image,
        })
        .collect())
}

/// Print the posts, as text or as JSON
pub fn run(blog: &Blog, json: bool) -> Result<()> {
    let posts = collect(blog)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&posts)?);
        return Ok(());
    }

    println!("Posts ({}):", posts.len());
    for post in posts {
        println!("  {} - {} [{}]", post.date, post.title, post.slug);
    }

    Ok(())
}
