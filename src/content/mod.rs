//! Content module - lists, splits and compiles post sources

mod frontmatter;
pub mod highlight;
mod lister;
pub mod markdown;
mod post;

pub use frontmatter::FrontMatter;
pub use highlight::{CodeBlockComponent, HighlightedCode, Highlighter, StyledToken};
pub use lister::{ContentLister, PostFile, PostFiles};
pub use markdown::{
    compile, CompiledTree, Component, Components, ElementKind, MarkdownRenderer, Node, NodeKind,
    TreeRenderer,
};
pub use post::PostRecord;
