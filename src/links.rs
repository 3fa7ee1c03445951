use select::document::Document;
use select::node::Node;
use select::predicate::Predicate;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Stylesheet,
    Script,
    Image,
}

/// Matches elements that reference an external resource and names the
/// attribute carrying its address.
#[derive(Debug, Clone, Copy)]
pub struct LinkRule {
    pub kind: ResourceKind,
    /// Element name (e.g., "link", "img")
    pub tag: &'static str,
    /// Attributes that must be present, optionally with an exact value
    pub required: &'static [(&'static str, Option<&'static str>)],
    /// Attribute holding the resource address
    pub source: &'static str,
}

/// Extraction rules, applied in this order.
///
/// Scripts only count when they carry a `type` attribute; untyped external
/// scripts are not timed.
pub const LINK_RULES: [LinkRule; 3] = [
    LinkRule {
        kind: ResourceKind::Stylesheet,
        tag: "link",
        required: &[("rel", Some("stylesheet"))],
        source: "href",
    },
    LinkRule {
        kind: ResourceKind::Script,
        tag: "script",
        required: &[("type", None)],
        source: "src",
    },
    LinkRule {
        kind: ResourceKind::Image,
        tag: "img",
        required: &[],
        source: "src",
    },
];

impl Predicate for LinkRule {
    fn matches(&self, node: &Node) -> bool {
        if node.name() != Some(self.tag) {
            return false;
        }
        let required = self.required.iter().all(|(key, value)| match value {
            Some(v) => node.attr(key) == Some(*v),
            None => node.attr(key).is_some(),
        });
        required && node.attr(self.source).is_some()
    }
}

impl<'a> Predicate for &'a LinkRule {
    fn matches(&self, node: &Node) -> bool {
        (*self).matches(node)
    }
}

/// Collects resource addresses from a parsed page, grouped by rule and in
/// document order within each group. Duplicates and relative addresses are
/// kept as written.
pub fn extract_links(doc: &Document) -> Vec<String> {
    let mut links = Vec::new();
    for rule in &LINK_RULES {
        let before = links.len();
        links.extend(
            doc.find(rule)
                .filter_map(|node| node.attr(rule.source))
                .map(str::to_string),
        );
        log::trace!("{:?}: {} links", rule.kind, links.len() - before);
    }
    links
}

pub fn extract_links_from_html(html: &str) -> Vec<String> {
    extract_links(&Document::from(html))
}

/// Resolves each link against the page address. Links that cannot be
/// joined are passed through unchanged.
pub fn resolve_links(base: &Url, links: Vec<String>) -> Vec<String> {
    links
        .into_iter()
        .map(|link| match base.join(&link) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => link,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_in_rule_order_and_skips_untyped_scripts() {
        let html = r#"
            <html><head>
                <script src="c.js"></script>
                <link rel="stylesheet" href="a.css">
                <script type="text/javascript" src="b.js"></script>
            </head>
            <body><img src="d.png"></body></html>
        "#;
        assert_eq!(extract_links_from_html(html), vec!["a.css", "b.js", "d.png"]);
    }

    #[test]
    fn keeps_document_order_and_duplicates_within_a_group() {
        let html = r#"
            <img src="2.png"><img src="1.png"><img src="2.png">
        "#;
        assert_eq!(extract_links_from_html(html), vec!["2.png", "1.png", "2.png"]);
    }

    #[test]
    fn ignores_non_stylesheet_links_and_missing_sources() {
        let html = r#"
            <link rel="icon" href="favicon.ico">
            <link rel="stylesheet">
            <link rel="preload stylesheet" href="x.css">
            <script type="module">inline()</script>
            <img alt="no source">
        "#;
        assert!(extract_links_from_html(html).is_empty());
    }

    #[test]
    fn empty_body_has_no_links() {
        assert!(extract_links_from_html("").is_empty());
    }

    #[test]
    fn resolves_relative_links_against_the_page() {
        let base = Url::parse("https://example.com/about/").unwrap();
        let links = vec![
            "style.css".to_string(),
            "/img/logo.png".to_string(),
            "https://cdn.example.net/app.js".to_string(),
        ];
        assert_eq!(
            resolve_links(&base, links),
            vec![
                "https://example.com/about/style.css",
                "https://example.com/img/logo.png",
                "https://cdn.example.net/app.js",
            ]
        );
    }
}
