//! HTML-like documents and prose markup.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::common;
use super::script::javascript_fragment;
use super::{Claims, Extractor, FactSet};
use crate::model::Dialect;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static SCRIPT_SRC: Lazy<Regex> =
    Lazy::new(|| re(r#"(?i)<script\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#));
static LINK_HREF: Lazy<Regex> =
    Lazy::new(|| re(r#"(?i)<link\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#));
static INLINE_SCRIPT: Lazy<Regex> = Lazy::new(|| re(r"(?is)<script\b[^>]*>(.*?)</script\s*>"));
static SCRIPT_OPEN: Lazy<Regex> = Lazy::new(|| re(r"(?i)<script\b"));
static SCRIPT_CLOSE: Lazy<Regex> = Lazy::new(|| re(r"(?i)</script\s*>"));
static TITLE: Lazy<Regex> = Lazy::new(|| re(r"(?is)<title[^>]*>(.*?)</title\s*>"));
static TAG: Lazy<Regex> = Lazy::new(|| re(r"<[^>]*>"));
static ELEMENT_ID: Lazy<Regex> = Lazy::new(|| re(r#"(?i)\bid\s*=\s*["']([\w-]+)["']"#));

static MD_LINK: Lazy<Regex> = Lazy::new(|| re(r"\[[^\]]*\]\(([^)\s]+)[^)]*\)"));
static MD_HEADING: Lazy<Regex> = Lazy::new(|| re(r"(?m)^#{1,6}[ \t]+(.+?)[ \t#]*$"));
static RST_INCLUDE: Lazy<Regex> =
    Lazy::new(|| re(r"(?m)^\.\.[ \t]+(?:include|literalinclude)::[ \t]+(\S+)"));

const HTML_LIKE: &[(&str, &str)] = &[
    ("html", "html"),
    ("htm", "html"),
    ("xhtml", "html"),
    ("vue", "vue"),
    ("svelte", "svelte"),
    ("xml", "xml"),
    ("svg", "svg"),
];

/// HTML, XML, Vue/Svelte single-file components, Markdown, and reStructuredText.
pub struct MarkupExtractor;

impl Extractor for MarkupExtractor {
    fn name(&self) -> &'static str {
        "markup"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Markup
    }

    fn claims(&self) -> Claims {
        Claims {
            extensions: &[
                "html", "htm", "xhtml", "vue", "svelte", "xml", "svg", "md", "markdown", "rst",
            ],
            file_names: &[],
            interpreters: &[],
        }
    }

    fn extract(&self, path: &Path, content: &str) -> FactSet {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let mut facts = if let Some((_, language)) = HTML_LIKE.iter().find(|(e, _)| *e == ext) {
            let mut facts = FactSet::for_language(*language);
            html(content, &mut facts);
            facts
        } else {
            let language = if ext == "rst" { "rst" } else { "markdown" };
            let mut facts = FactSet::for_language(language);
            prose(content, language, &mut facts);
            facts
        };
        common::scan_ports(content, &mut facts);
        // Pages and prose only ever refer to ports.
        facts.listen_ports.clear();
        facts
    }
}

fn html(content: &str, facts: &mut FactSet) {
    for re in [&*SCRIPT_SRC, &*LINK_HREF] {
        for cap in re.captures_iter(content) {
            if is_local(&cap[1]) {
                facts.add_import(&cap[1]);
            }
        }
    }
    for cap in INLINE_SCRIPT.captures_iter(content) {
        javascript_fragment(&cap[1], facts);
    }
    for cap in ELEMENT_ID.captures_iter(content) {
        facts.add_export(&format!("#{}", &cap[1]));
    }

    let opened = content.matches("<!--").count();
    let closed = content.matches("-->").count();
    if opened > closed {
        facts.mark_incomplete("unterminated HTML comment");
    }
    if SCRIPT_OPEN.find_iter(content).count() > SCRIPT_CLOSE.find_iter(content).count() {
        facts.mark_incomplete("unterminated <script> element");
    }

    let comment = content.find("<!--").and_then(|start| {
        let body = &content[start + 4..];
        common::normalize_purpose(&body[..body.find("-->").unwrap_or(body.len())])
    });
    facts.purpose = comment.or_else(|| {
        let title = TITLE.captures(content)?;
        common::normalize_purpose(&TAG.replace_all(&title[1], ""))
    });
}

fn prose(content: &str, language: &str, facts: &mut FactSet) {
    let mut in_fence = false;
    let mut text = String::with_capacity(content.len());
    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence {
            text.push_str(line);
            text.push('\n');
        }
    }
    if in_fence {
        facts.mark_incomplete("unterminated code fence");
    }

    for cap in MD_LINK.captures_iter(&text) {
        let target = cap[1].split('#').next().unwrap_or_default();
        if is_local(target) && !target.is_empty() {
            facts.add_import(target);
        }
    }
    if language == "rst" {
        for cap in RST_INCLUDE.captures_iter(&text) {
            facts.add_import(&cap[1]);
        }
    }
    for cap in MD_HEADING.captures_iter(&text) {
        facts.add_export(cap[1].trim());
    }

    facts.purpose = first_heading_or_paragraph(&text);
}

fn first_heading_or_paragraph(text: &str) -> Option<String> {
    if let Some(cap) = MD_HEADING.captures(text) {
        return common::normalize_purpose(&cap[1]);
    }
    let paragraph: Vec<&str> = text
        .lines()
        .map(str::trim)
        .skip_while(|l| l.is_empty() || l.chars().all(|c| "=-~*#".contains(c)))
        .take_while(|l| !l.is_empty())
        .collect();
    common::normalize_purpose(&paragraph.join(" "))
}

fn is_local(target: &str) -> bool {
    !(target.contains("://")
        || target.starts_with("//")
        || target.starts_with("data:")
        || target.starts_with("mailto:")
        || target.starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(path: &str, content: &str) -> FactSet {
        MarkupExtractor.extract(Path::new(path), content)
    }

    #[test]
    fn html_assets_inline_scripts_and_title() {
        let facts = run(
            "web/index.html",
            r#"<html><head><title>Lobby <b>Client</b></title>
<link rel="stylesheet" href="style.css">
<link href="https://cdn.example.com/x.css" rel="stylesheet">
<script src="./js/app.js"></script>
</head><body id="root">
<script>
function connect() { return new WebSocket('ws://localhost:8765'); }
</script>
</body></html>"#,
        );
        assert_eq!(facts.language, "html");
        assert_eq!(facts.imports, vec!["./js/app.js", "style.css"]);
        assert_eq!(facts.exports, vec!["connect", "#root"]);
        assert_eq!(facts.purpose.as_deref(), Some("Lobby Client"));
        assert!(facts.declared_ports.contains(&8765));
        assert!(facts.listen_ports.is_empty());
        assert!(!facts.incomplete);
    }

    #[test]
    fn documented_listen_call_is_only_a_reference() {
        let facts = run("README.md", "# Server\n\nStart with `app.listen(3000)`.\n");
        assert!(facts.declared_ports.contains(&3000));
        assert!(facts.listen_ports.is_empty());
    }

    #[test]
    fn html_comment_wins_over_title() {
        let facts = run("a.html", "<!-- Admin dashboard -->\n<title>Admin</title>");
        assert_eq!(facts.purpose.as_deref(), Some("Admin dashboard"));
    }

    #[test]
    fn html_unterminated_elements_are_partial() {
        let facts = run("a.html", "<!-- open\n<script>\nfunction f() {}\n");
        assert!(facts.incomplete);
        assert_eq!(facts.notes.len(), 2);
    }

    #[test]
    fn markdown_links_headings_and_fences() {
        let facts = run(
            "docs/README.md",
            "# Game Server\n\nSee [setup](setup.md#install) and [site](https://x.io).\n\n```\n[not](a.md)\n```\n## Usage\n",
        );
        assert_eq!(facts.language, "markdown");
        assert_eq!(facts.imports, vec!["setup.md"]);
        assert_eq!(facts.exports, vec!["Game Server", "Usage"]);
        assert_eq!(facts.purpose.as_deref(), Some("Game Server"));
        assert!(!facts.incomplete);
    }

    #[test]
    fn markdown_without_heading_uses_first_paragraph() {
        let facts = run("notes.md", "\nA tiny tool\nthat does things.\n\nMore.\n```\nunclosed");
        assert_eq!(facts.purpose.as_deref(), Some("A tiny tool that does things."));
        assert!(facts.incomplete);
    }

    #[test]
    fn rst_includes() {
        let facts = run("index.rst", "Title\n=====\n\n.. include:: intro.rst\n");
        assert_eq!(facts.language, "rst");
        assert_eq!(facts.imports, vec!["intro.rst"]);
        assert_eq!(facts.purpose.as_deref(), Some("Title"));
    }
}
