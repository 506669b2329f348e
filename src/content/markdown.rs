//! Markdown compilation into a renderable tree, and rendering with
//! per-node-kind component overrides

use pulldown_cmark::{Alignment, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::highlight::CodeBlockComponent;
use crate::config::HighlightConfig;
use crate::error::RenderError;
use crate::helpers::html_escape;

/// A node of a compiled markdown body
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element {
        kind: ElementKind,
        children: Vec<Node>,
    },
    /// Fenced or indented code block with its declared language tag
    CodeBlock {
        lang: Option<String>,
        code: String,
    },
    Text(String),
    /// Inline code span
    Code(String),
    Html(String),
    SoftBreak,
    HardBreak,
    Rule,
    TaskMarker(bool),
}

/// Element nodes that wrap children
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Paragraph,
    /// Level plus any `{#id .class}` attributes
    Heading {
        level: u8,
        id: Option<String>,
        classes: Vec<String>,
    },
    BlockQuote,
    /// Ordered lists carry their first number
    List(Option<u64>),
    Item,
    Emphasis,
    Strong,
    Strikethrough,
    Link { href: String, title: String },
    Image { src: String, title: String },
    Table(Vec<Alignment>),
    TableHead,
    TableRow,
    TableCell,
    /// Any other container; only its children are emitted
    Fragment,
}

/// Key of the component override table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Paragraph,
    Heading,
    BlockQuote,
    List,
    Item,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Image,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Fragment,
    CodeBlock,
    Text,
    Code,
    Html,
    SoftBreak,
    HardBreak,
    Rule,
    TaskMarker,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Element { kind, .. } => match kind {
                ElementKind::Paragraph => NodeKind::Paragraph,
                ElementKind::Heading { .. } => NodeKind::Heading,
                ElementKind::BlockQuote => NodeKind::BlockQuote,
                ElementKind::List(_) => NodeKind::List,
                ElementKind::Item => NodeKind::Item,
                ElementKind::Emphasis => NodeKind::Emphasis,
                ElementKind::Strong => NodeKind::Strong,
                ElementKind::Strikethrough => NodeKind::Strikethrough,
                ElementKind::Link { .. } => NodeKind::Link,
                ElementKind::Image { .. } => NodeKind::Image,
                ElementKind::Table(_) => NodeKind::Table,
                ElementKind::TableHead => NodeKind::TableHead,
                ElementKind::TableRow => NodeKind::TableRow,
                ElementKind::TableCell => NodeKind::TableCell,
                ElementKind::Fragment => NodeKind::Fragment,
            },
            Node::CodeBlock { .. } => NodeKind::CodeBlock,
            Node::Text(_) => NodeKind::Text,
            Node::Code(_) => NodeKind::Code,
            Node::Html(_) => NodeKind::Html,
            Node::SoftBreak => NodeKind::SoftBreak,
            Node::HardBreak => NodeKind::HardBreak,
            Node::Rule => NodeKind::Rule,
            Node::TaskMarker(_) => NodeKind::TaskMarker,
        }
    }

    /// Plain text content of this node and its descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Node::Element { children, .. } => {
                for child in children {
                    child.push_text(out);
                }
            }
            Node::CodeBlock { code, .. } => out.push_str(code),
            Node::Text(text) | Node::Code(text) => out.push_str(text),
            Node::SoftBreak | Node::HardBreak => out.push('\n'),
            Node::Html(_) | Node::Rule | Node::TaskMarker(_) => {}
        }
    }
}

/// The compiled form of a markdown body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledTree {
    pub nodes: Vec<Node>,
}

impl CompiledTree {
    /// Plain text of the whole body
    pub fn text(&self) -> String {
        self.nodes.iter().map(Node::text).collect()
    }

    /// All code blocks, in document order
    pub fn code_blocks(&self) -> Vec<&Node> {
        fn walk<'a>(nodes: &'a [Node], found: &mut Vec<&'a Node>) {
            for node in nodes {
                match node {
                    Node::CodeBlock { .. } => found.push(node),
                    Node::Element { children, .. } => walk(children, found),
                    _ => {}
                }
            }
        }

        let mut found = Vec::new();
        walk(&self.nodes, &mut found);
        found
    }
}

fn parser_options() -> Options {
    // YAML metadata blocks are not enabled: front-matter is split off first
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Compile a markdown body into a tree
pub fn compile(markdown: &str) -> CompiledTree {
    let parser = Parser::new_ext(markdown, parser_options());

    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<(ElementKind, Vec<Node>)> = Vec::new();
    let mut code_block: Option<(Option<String>, String)> = None;

    for event in parser {
        if code_block.is_some() {
            match event {
                Event::Text(text) => {
                    if let Some((_, code)) = code_block.as_mut() {
                        code.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, code)) = code_block.take() {
                        push_node(&mut stack, &mut root, Node::CodeBlock { lang, code });
                    }
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                code_block = Some((code_language(&kind), String::new()));
            }
            Event::Start(tag) => stack.push((element_kind(tag), Vec::new())),
            Event::End(_) => {
                if let Some((kind, children)) = stack.pop() {
                    push_node(&mut stack, &mut root, Node::Element { kind, children });
                }
            }
            Event::Text(text) => push_node(&mut stack, &mut root, Node::Text(text.into_string())),
            Event::Code(code) => push_node(&mut stack, &mut root, Node::Code(code.into_string())),
            Event::Html(html) | Event::InlineHtml(html) => {
                push_node(&mut stack, &mut root, Node::Html(html.into_string()))
            }
            Event::SoftBreak => push_node(&mut stack, &mut root, Node::SoftBreak),
            Event::HardBreak => push_node(&mut stack, &mut root, Node::HardBreak),
            Event::Rule => push_node(&mut stack, &mut root, Node::Rule),
            Event::TaskListMarker(checked) => {
                push_node(&mut stack, &mut root, Node::TaskMarker(checked))
            }
            _ => {}
        }
    }

    // Close anything left open by a truncated event stream
    while let Some((kind, children)) = stack.pop() {
        push_node(&mut stack, &mut root, Node::Element { kind, children });
    }

    CompiledTree { nodes: root }
}

fn push_node(stack: &mut [(ElementKind, Vec<Node>)], root: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some((_, children)) => children.push(node),
        None => root.push(node),
    }
}

/// Language tag of a code block: the first word of the fence info string
fn code_language(kind: &CodeBlockKind<'_>) -> Option<String> {
    match kind {
        CodeBlockKind::Fenced(info) => info
            .split(|c: char| c.is_whitespace() || c == ',' || c == '{')
            .next()
            .map(|lang| lang.trim_start_matches("language-"))
            .filter(|lang| !lang.is_empty())
            .map(str::to_string),
        CodeBlockKind::Indented => None,
    }
}

fn element_kind(tag: Tag<'_>) -> ElementKind {
    match tag {
        Tag::Paragraph => ElementKind::Paragraph,
        Tag::Heading {
            level, id, classes, ..
        } => ElementKind::Heading {
            level: level as u8,
            id: id.map(|id| id.into_string()),
            classes: classes.into_iter().map(|c| c.into_string()).collect(),
        },
        Tag::BlockQuote(_) => ElementKind::BlockQuote,
        Tag::List(start) => ElementKind::List(start),
        Tag::Item => ElementKind::Item,
        Tag::Emphasis => ElementKind::Emphasis,
        Tag::Strong => ElementKind::Strong,
        Tag::Strikethrough => ElementKind::Strikethrough,
        Tag::Link {
            dest_url, title, ..
        } => ElementKind::Link {
            href: dest_url.into_string(),
            title: title.into_string(),
        },
        Tag::Image {
            dest_url, title, ..
        } => ElementKind::Image {
            src: dest_url.into_string(),
            title: title.into_string(),
        },
        Tag::Table(alignments) => ElementKind::Table(alignments),
        Tag::TableHead => ElementKind::TableHead,
        Tag::TableRow => ElementKind::TableRow,
        Tag::TableCell => ElementKind::TableCell,
        _ => ElementKind::Fragment,
    }
}

/// Replaces the default rendering of one node kind
pub trait Component: Send + Sync {
    /// Render `node` into `out`; `renderer` renders any children
    fn render(
        &self,
        node: &Node,
        renderer: &TreeRenderer,
        out: &mut String,
    ) -> Result<(), RenderError>;
}

/// Override table keyed by node kind
#[derive(Clone, Default)]
pub struct Components {
    table: HashMap<NodeKind, Arc<dyn Component>>,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    /// The blog's default table: code blocks go through the highlighter
    pub fn with_highlighting(config: &HighlightConfig) -> Self {
        Self::new().with(NodeKind::CodeBlock, CodeBlockComponent::new(config))
    }

    /// Add or replace the override for `kind`
    pub fn with<C: Component + 'static>(mut self, kind: NodeKind, component: C) -> Self {
        self.table.insert(kind, Arc::new(component));
        self
    }

    pub fn get(&self, kind: NodeKind) -> Option<&Arc<dyn Component>> {
        self.table.get(&kind)
    }
}

impl fmt::Debug for Components {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.table.keys()).finish()
    }
}

/// Renders a compiled tree to HTML, consulting the override table first
#[derive(Debug, Clone, Default)]
pub struct TreeRenderer {
    components: Components,
}

impl TreeRenderer {
    pub fn new(components: Components) -> Self {
        Self { components }
    }

    pub fn render(&self, tree: &CompiledTree) -> Result<String, RenderError> {
        let mut out = String::new();
        self.render_nodes(&tree.nodes, &mut out)?;
        Ok(out)
    }

    pub fn render_nodes(&self, nodes: &[Node], out: &mut String) -> Result<(), RenderError> {
        for node in nodes {
            self.render_node(node, out)?;
        }
        Ok(())
    }

    pub fn render_node(&self, node: &Node, out: &mut String) -> Result<(), RenderError> {
        match self.components.get(node.kind()) {
            Some(component) => component.render(node, self, out),
            None => self.render_default(node, out),
        }
    }

    /// Built-in rendering, ignoring any override for this node itself
    pub fn render_default(&self, node: &Node, out: &mut String) -> Result<(), RenderError> {
        match node {
            Node::Element { kind, children } => self.render_element(kind, children, out)?,
            Node::CodeBlock { lang, code } => {
                match lang {
                    Some(lang) => out.push_str(&format!(
                        r#"<pre><code class="language-{}">"#,
                        html_escape(lang)
                    )),
                    None => out.push_str("<pre><code>"),
                }
                out.push_str(&html_escape(code));
                out.push_str("</code></pre>\n");
            }
            Node::Text(text) => out.push_str(&html_escape(text)),
            Node::Code(code) => {
                out.push_str("<code>");
                out.push_str(&html_escape(code));
                out.push_str("</code>");
            }
            Node::Html(html) => out.push_str(html),
            Node::SoftBreak => out.push('\n'),
            Node::HardBreak => out.push_str("<br />\n"),
            Node::Rule => out.push_str("<hr />\n"),
            Node::TaskMarker(checked) => {
                let checked = if *checked { " checked=\"\"" } else { "" };
                out.push_str(&format!(
                    r#"<input disabled="" type="checkbox"{} />"#,
                    checked
                ));
                out.push('\n');
            }
        }
        Ok(())
    }

    fn render_element(
        &self,
        kind: &ElementKind,
        children: &[Node],
        out: &mut String,
    ) -> Result<(), RenderError> {
        let (open, close) = match kind {
            ElementKind::Paragraph => ("<p>".to_string(), "</p>\n".to_string()),
            ElementKind::Heading { level, id, classes } => {
                let mut open = format!("<h{}", level);
                if let Some(id) = id {
                    open.push_str(&format!(" id=\"{}\"", html_escape(id)));
                }
                if !classes.is_empty() {
                    open.push_str(&format!(" class=\"{}\"", html_escape(&classes.join(" "))));
                }
                open.push('>');
                (open, format!("</h{}>\n", level))
            }
            ElementKind::BlockQuote => ("<blockquote>\n".to_string(), "</blockquote>\n".to_string()),
            ElementKind::List(Some(1)) => ("<ol>\n".to_string(), "</ol>\n".to_string()),
            ElementKind::List(Some(start)) => {
                (format!("<ol start=\"{}\">\n", start), "</ol>\n".to_string())
            }
            ElementKind::List(None) => ("<ul>\n".to_string(), "</ul>\n".to_string()),
            ElementKind::Item => ("<li>".to_string(), "</li>\n".to_string()),
            ElementKind::Emphasis => ("<em>".to_string(), "</em>".to_string()),
            ElementKind::Strong => ("<strong>".to_string(), "</strong>".to_string()),
            ElementKind::Strikethrough => ("<del>".to_string(), "</del>".to_string()),
            ElementKind::Link { href, title } => {
                let title = if title.is_empty() {
                    String::new()
                } else {
                    format!(" title=\"{}\"", html_escape(title))
                };
                (
                    format!("<a href=\"{}\"{}>", html_escape(href), title),
                    "</a>".to_string(),
                )
            }
            ElementKind::Image { src, title } => {
                let alt: String = children.iter().map(Node::text).collect();
                out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\"",
                    html_escape(src),
                    html_escape(&alt)
                ));
                if !title.is_empty() {
                    out.push_str(&format!(" title=\"{}\"", html_escape(title)));
                }
                out.push_str(" />");
                return Ok(());
            }
            ElementKind::Table(alignments) => {
                return self.render_table(alignments, children, out);
            }
            // Reached only when a table part is rendered outside render_table
            ElementKind::TableHead | ElementKind::TableRow => {
                ("<tr>".to_string(), "</tr>\n".to_string())
            }
            ElementKind::TableCell => ("<td>".to_string(), "</td>".to_string()),
            ElementKind::Fragment => (String::new(), String::new()),
        };

        out.push_str(&open);
        self.render_nodes(children, out)?;
        out.push_str(&close);
        Ok(())
    }

    fn render_table(
        &self,
        alignments: &[Alignment],
        children: &[Node],
        out: &mut String,
    ) -> Result<(), RenderError> {
        out.push_str("<table>");
        let mut body_open = false;

        for child in children {
            let Node::Element { kind, children: cells } = child else {
                self.render_node(child, out)?;
                continue;
            };
            let in_head = match kind {
                ElementKind::TableHead => true,
                ElementKind::TableRow => false,
                _ => {
                    self.render_node(child, out)?;
                    continue;
                }
            };

            if in_head {
                out.push_str("<thead><tr>");
            } else {
                if !body_open {
                    out.push_str("<tbody>\n");
                    body_open = true;
                }
                out.push_str("<tr>");
            }

            let tag = if in_head { "th" } else { "td" };
            for (column, cell) in cells.iter().enumerate() {
                let Node::Element { children, .. } = cell else {
                    self.render_node(cell, out)?;
                    continue;
                };
                let align = match alignments.get(column) {
                    Some(Alignment::Left) => " style=\"text-align: left\"",
                    Some(Alignment::Center) => " style=\"text-align: center\"",
                    Some(Alignment::Right) => " style=\"text-align: right\"",
                    _ => "",
                };
                out.push_str(&format!("<{}{}>", tag, align));
                self.render_nodes(children, out)?;
                out.push_str(&format!("</{}>", tag));
            }

            if in_head {
                out.push_str("</tr></thead>\n");
            } else {
                out.push_str("</tr>\n");
            }
        }

        if body_open {
            out.push_str("</tbody>\n");
        }
        out.push_str("</table>\n");
        Ok(())
    }
}

/// Markdown renderer with syntax highlighting
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    tree_renderer: TreeRenderer,
}

impl MarkdownRenderer {
    /// Create a renderer that highlights code blocks
    pub fn new(config: &HighlightConfig) -> Self {
        Self::with_components(Components::with_highlighting(config))
    }

    /// Create with a custom override table
    pub fn with_components(components: Components) -> Self {
        Self {
            tree_renderer: TreeRenderer::new(components),
        }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> Result<String, RenderError> {
        self.tree_renderer.render(&compile(markdown))
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(&HighlightConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::strip_html;

    fn plain() -> TreeRenderer {
        TreeRenderer::default()
    }

    #[test]
    fn test_compile_paragraph() {
        let tree = compile("hello");
        assert_eq!(
            tree.nodes,
            vec![Node::Element {
                kind: ElementKind::Paragraph,
                children: vec![Node::Text("hello".to_string())],
            }]
        );
    }

    #[test]
    fn test_render_basic_markdown() {
        let html = plain()
            .render(&compile("# Hello World\n\nThis is a *test*."))
            .unwrap();
        assert!(html.contains("<h1>Hello World</h1>"));
        assert!(html.contains("<p>This is a <em>test</em>.</p>"));
    }

    #[test]
    fn test_compile_code_block() {
        let tree = compile("intro\n\n```js\nconst a = 1;\n```\n");
        let blocks = tree.code_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0],
            &Node::CodeBlock {
                lang: Some("js".to_string()),
                code: "const a = 1;\n".to_string(),
            }
        );
    }

    #[test]
    fn test_code_language_from_info_string() {
        let tree = compile("```rust,ignore\nfn main() {}\n```\n\n    indented\n");
        let blocks = tree.code_blocks();
        assert!(matches!(blocks[0], Node::CodeBlock { lang: Some(l), .. } if l == "rust"));
        assert!(matches!(blocks[1], Node::CodeBlock { lang: None, .. }));
    }

    #[test]
    fn test_default_code_block_is_plain() {
        let html = plain().render(&compile("```js\nif (a < b) {}\n```")).unwrap();
        assert_eq!(
            html,
            "<pre><code class=\"language-js\">if (a &lt; b) {}\n</code></pre>\n"
        );
    }

    #[test]
    fn test_text_is_escaped() {
        let html = plain().render(&compile("Tom & Jerry <3")).unwrap();
        assert!(html.contains("Tom &amp; Jerry &lt;3"));
    }

    #[test]
    fn test_links_and_images() {
        let html = plain()
            .render(&compile(
                "[home](/ \"Go home\") ![a cat](/cat.png)",
            ))
            .unwrap();
        assert!(html.contains(r#"<a href="/" title="Go home">home</a>"#));
        assert!(html.contains(r#"<img src="/cat.png" alt="a cat" />"#));
    }

    #[test]
    fn test_lists_and_tasks() {
        let html = plain()
            .render(&compile("3. three\n4. four\n\n- [x] done\n"))
            .unwrap();
        assert!(html.contains("<ol start=\"3\">"));
        assert!(html.contains("<li>three</li>"));
        assert!(html.contains("checked=\"\""));
    }

    #[test]
    fn test_table() {
        let html = plain()
            .render(&compile("| a | b |\n|:--|--:|\n| 1 | 2 |\n"))
            .unwrap();
        assert!(html.contains("<thead><tr><th style=\"text-align: left\">a</th>"));
        assert!(html.contains("<tbody>\n<tr><td style=\"text-align: left\">1</td>"));
        assert!(html.contains("<td style=\"text-align: right\">2</td>"));
    }

    struct Shout;

    impl Component for Shout {
        fn render(
            &self,
            node: &Node,
            _renderer: &TreeRenderer,
            out: &mut String,
        ) -> Result<(), RenderError> {
            out.push_str(&node.text().to_uppercase());
            Ok(())
        }
    }

    #[test]
    fn test_override_replaces_only_its_kind() {
        let renderer = TreeRenderer::new(Components::new().with(NodeKind::Strong, Shout));
        let html = renderer.render(&compile("say **hi** *there*")).unwrap();
        assert_eq!(html, "<p>say HI <em>there</em></p>\n");
    }

    #[test]
    fn test_override_is_applied_to_nested_nodes() {
        let renderer = TreeRenderer::new(Components::new().with(NodeKind::CodeBlock, Shout));
        let html = renderer
            .render(&compile("> quoted\n>\n> ```\n> code\n> ```\n"))
            .unwrap();
        assert!(html.contains("<blockquote>"));
        assert!(html.contains("CODE\n"));
        assert!(!html.contains("<pre>"));
    }

    #[test]
    fn test_render_keeps_body_text() {
        let renderer = MarkdownRenderer::default();
        let html = renderer.render("hello").unwrap();
        assert!(strip_html(&html).contains("hello"));
    }

    #[test]
    fn test_highlighting_is_the_default_override() {
        let renderer = MarkdownRenderer::default();
        let html = renderer.render("```rust\nfn main() {}\n```").unwrap();
        assert!(html.contains("class=\"highlight language-rust\""));
        assert!(html.contains("token-line"));
    }

    #[test]
    fn test_thematic_break_in_body() {
        let tree = compile("above\n\n---\n\nbelow\n");
        assert_eq!(tree.nodes[1], Node::Rule);

        let html = plain().render(&tree).unwrap();
        assert_eq!(html, "<p>above</p>\n<hr />\n<p>below</p>\n");
    }

    #[test]
    fn test_heading_attributes() {
        let tree = compile("# Intro {#intro .lead .wide}\n\n## Plain\n");
        assert_eq!(
            tree.nodes[0],
            Node::Element {
                kind: ElementKind::Heading {
                    level: 1,
                    id: Some("intro".to_string()),
                    classes: vec!["lead".to_string(), "wide".to_string()],
                },
                children: vec![Node::Text("Intro".to_string())],
            }
        );

        let html = plain().render(&tree).unwrap();
        assert!(html.contains(r#"<h1 id="intro" class="lead wide">Intro</h1>"#));
        assert!(html.contains("<h2>Plain</h2>"));
    }
}
