//! Heuristics shared by every extractor: ports, purpose lines, command references.

use once_cell::sync::Lazy;
use regex::Regex;

use super::FactSet;

/// Longest purpose line kept, in characters.
pub const PURPOSE_MAX_CHARS: usize = 200;

static PORT_ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?im)(?:^|[^a-z0-9])port["']?\s*[:=]\s*["']?(\d+)\b"#).expect("valid regex")
});
static PORT_ENV_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:["']port["']\s*,\s*["']?|env\.port\s*(?:\|\||\?\?)\s*)(\d+)\b"#)
        .expect("valid regex")
});
static PORT_FLAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)--port(?:=|\s+)(\d+)\b").expect("valid regex"));
static LISTEN_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.listen\(\s*(\d+)\b").expect("valid regex"));
static EXPOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*EXPOSE\s+(\d+)").expect("valid regex"));
static URL_PORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\b[a-z][a-z0-9+.-]*://[a-z0-9.-]+|\blocalhost|\b127\.0\.0\.1|\b0\.0\.0\.0|\[::1\]):(\d+)\b",
    )
    .expect("valid regex")
});
static COMMAND_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\b(?:python3?|node|deno|bun|ruby|bash|sh|ts-node|tsx)["']?(?:\s*,\s*["']|\s+)(?:-{1,2}[\w-]+\s+)*["']?([\w./-]+\.(?:py|js|mjs|cjs|ts|rb|sh))\b"#,
    )
    .expect("valid regex")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Records every port literal in `content`.
///
/// Assignments, `--port` flags, `.listen(n)` calls and `EXPOSE` lines count
/// as bindings; `host:port` inside URLs counts as a reference only.
pub fn scan_ports(content: &str, facts: &mut FactSet) {
    for re in [&*PORT_ASSIGN, &*PORT_ENV_DEFAULT, &*PORT_FLAG, &*LISTEN_CALL, &*EXPOSE] {
        for cap in re.captures_iter(content) {
            if let Some(port) = parse_port(&cap[1], facts) {
                facts.bind_port(port);
            }
        }
    }
    for cap in URL_PORT.captures_iter(content) {
        if let Some(port) = parse_port(&cap[1], facts) {
            facts.reference_port(port);
        }
    }
}

/// Parses a port literal, noting (and marking incomplete) anything outside 1..=65535.
pub fn parse_port(literal: &str, facts: &mut FactSet) -> Option<u16> {
    match literal.parse::<u32>().ok().and_then(|n| u16::try_from(n).ok()) {
        Some(port) if port > 0 => Some(port),
        _ => {
            facts.mark_incomplete(format!("port literal '{literal}' out of range"));
            None
        }
    }
}

/// Records script paths launched by interpreter commands (`python app.py`,
/// `["node", "server.js"]`) as imports.
pub fn scan_command_refs(content: &str, facts: &mut FactSet) {
    for cap in COMMAND_REF.captures_iter(content) {
        facts.add_import(&cap[1]);
    }
}

/// Comment syntax of a file, for purpose extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `#` line comments (shell, Ruby, YAML, TOML, Dockerfile).
    Hash,
    /// `#` comments plus leading triple-quoted docstrings.
    Python,
    /// `//` line comments and `/* */` blocks.
    Slash,
    /// `;` or `#` line comments (INI).
    Ini,
}

/// Leading comment or docstring of a file, collapsed to one line.
///
/// Skips a shebang, editor/encoding lines, and blank lines. An unterminated
/// block comment marks `facts` incomplete and yields whatever text was seen.
pub fn leading_comment(content: &str, style: CommentStyle, facts: &mut FactSet) -> Option<String> {
    let body = skip_preamble(content);

    if style == CommentStyle::Python {
        for quote in ["\"\"\"", "'''"] {
            if let Some(rest) = body.strip_prefix(quote) {
                return match rest.find(quote) {
                    Some(end) => normalize_purpose(&rest[..end]),
                    None => {
                        facts.mark_incomplete("unterminated docstring");
                        normalize_purpose(rest)
                    }
                };
            }
        }
    }

    if style == CommentStyle::Slash {
        if let Some(rest) = body.strip_prefix("/*") {
            let text = match rest.find("*/") {
                Some(end) => &rest[..end],
                None => {
                    facts.mark_incomplete("unterminated block comment");
                    rest
                }
            };
            let cleaned: Vec<&str> = text
                .lines()
                .map(|l| l.trim().trim_start_matches('*').trim())
                .filter(|l| !l.starts_with('@'))
                .collect();
            return normalize_purpose(&cleaned.join(" "));
        }
    }

    let markers: &[&str] = match style {
        CommentStyle::Hash | CommentStyle::Python => &["#"],
        CommentStyle::Slash => &["///", "//!", "//"],
        CommentStyle::Ini => &[";", "#"],
    };
    let mut lines = Vec::new();
    for line in body.lines() {
        let trimmed = line.trim();
        let Some(text) = markers.iter().find_map(|m| trimmed.strip_prefix(m)) else {
            break;
        };
        lines.push(text.trim());
    }
    normalize_purpose(&lines.join(" "))
}

/// Collapses whitespace and truncates to [`PURPOSE_MAX_CHARS`]. Empty text yields `None`.
#[must_use]
pub fn normalize_purpose(text: &str) -> Option<String> {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ");
    let collapsed = collapsed.trim_matches(|c: char| c == '-' || c == '=' || c.is_whitespace());
    if collapsed.is_empty() {
        return None;
    }
    if collapsed.chars().count() <= PURPOSE_MAX_CHARS {
        return Some(collapsed.to_string());
    }
    let cut: String = collapsed.chars().take(PURPOSE_MAX_CHARS - 3).collect();
    Some(format!("{}...", cut.trim_end()))
}

/// Interpreter named by a `#!` line (`python3` for `#!/usr/bin/env python3`).
#[must_use]
pub fn shebang_interpreter(content: &str) -> Option<&str> {
    let first = content.lines().next()?.strip_prefix("#!")?;
    let mut parts = first.split_whitespace();
    let program = parts.next()?.rsplit('/').next()?;
    if program == "env" {
        parts
            .find(|p| !p.starts_with('-'))
            .map(|p| p.rsplit('/').next().unwrap_or(p))
    } else {
        Some(program)
    }
}

fn skip_preamble(content: &str) -> &str {
    let mut rest = content.trim_start_matches('\u{feff}');
    loop {
        let trimmed = rest.trim_start();
        let line_end = trimmed.find('\n').map_or(trimmed.len(), |i| i + 1);
        let line = trimmed[..line_end].trim();
        let is_preamble = line.starts_with("#!")
            || line.contains("-*-")
            || line.starts_with("# vim:")
            || line.starts_with("// @ts-")
            || line == "\"use strict\";"
            || line == "'use strict';";
        if is_preamble && !line.is_empty() {
            rest = &trimmed[line_end..];
        } else {
            return trimmed;
        }
    }
}
