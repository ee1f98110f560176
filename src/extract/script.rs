//! Programming-language and shell sources.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::common::{self, CommentStyle};
use super::{Claims, Extractor, FactSet};
use crate::model::Dialect;

const LANGUAGES: &[(&str, &str)] = &[
    ("py", "python"),
    ("pyw", "python"),
    ("js", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("d.ts", "typescript"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("zsh", "shell"),
    ("rb", "ruby"),
    ("go", "go"),
    ("rs", "rust"),
];

const INTERPRETERS: &[(&str, &str)] = &[
    ("python", "python"),
    ("node", "javascript"),
    ("deno", "javascript"),
    ("bun", "javascript"),
    ("ts-node", "typescript"),
    ("bash", "shell"),
    ("zsh", "shell"),
    ("sh", "shell"),
    ("ruby", "ruby"),
];

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static PY_IMPORT: Lazy<Regex> = Lazy::new(|| re(r"(?m)^[ \t]*import[ \t]+([\w., \t]+)$"));
static PY_FROM: Lazy<Regex> =
    Lazy::new(|| re(r"(?m)^[ \t]*from[ \t]+(\.*)([\w.]*)[ \t]+import[ \t]+\(?([\w, \t]+)"));
static PY_DEF: Lazy<Regex> =
    Lazy::new(|| re(r"(?m)^(?:async[ \t]+)?(?:def|class)[ \t]+([A-Za-z_]\w*)"));

static JS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    re(
        r#"(?m)^[ \t]*(?:import|export)[ \t]+(?:type[ \t]+)?(?:[\w*{}$, \t\n]+?[ \t]+from[ \t]+)?["']([^"']+)["']"#,
    )
});
static JS_REQUIRE: Lazy<Regex> =
    Lazy::new(|| re(r#"\b(?:require|import)\(\s*["']([^"']+)["']\s*\)"#));
static JS_EXPORT: Lazy<Regex> = Lazy::new(|| {
    re(
        r"(?m)^[ \t]*export[ \t]+(?:default[ \t]+)?(?:async[ \t]+)?(?:function\*?|class|const|let|var|interface|type|enum)[ \t]+([A-Za-z_$][\w$]*)",
    )
});
static JS_TOP_LEVEL: Lazy<Regex> =
    Lazy::new(|| re(r"(?m)^(?:async[ \t]+)?(?:function\*?|class)[ \t]+([A-Za-z_$][\w$]*)"));
static JS_COMMONJS: Lazy<Regex> =
    Lazy::new(|| re(r"(?m)^[ \t]*(?:module\.)?exports\.([A-Za-z_$][\w$]*)[ \t]*="));

static SH_SOURCE: Lazy<Regex> =
    Lazy::new(|| re(r#"(?m)^[ \t]*(?:source|\.)[ \t]+["']?([^\s"';]+)"#));
static SH_FUNCTION: Lazy<Regex> =
    Lazy::new(|| re(r"(?m)^[ \t]*(?:function[ \t]+)?([A-Za-z_][\w-]*)[ \t]*\(\)[ \t]*\{?"));

static RB_REQUIRE: Lazy<Regex> =
    Lazy::new(|| re(r#"(?m)^[ \t]*require(?:_relative)?[ \t]*\(?[ \t]*["']([^"']+)["']"#));
static RB_DEF: Lazy<Regex> = Lazy::new(|| {
    re(r"(?m)^[ \t]*(?:def|class|module)[ \t]+(?:self\.)?([A-Za-z_]\w*[?!]?)")
});

static GO_IMPORT_LINE: Lazy<Regex> =
    Lazy::new(|| re(r#"(?m)^[ \t]*import[ \t]+(?:[\w.]+[ \t]+)?"([^"]+)""#));
static GO_IMPORT_BLOCK: Lazy<Regex> = Lazy::new(|| re(r"(?ms)^[ \t]*import[ \t]*\((.*?)\)"));
static QUOTED: Lazy<Regex> = Lazy::new(|| re(r#""([^"]+)""#));
static GO_EXPORT: Lazy<Regex> =
    Lazy::new(|| re(r"(?m)^(?:func(?:[ \t]*\([^)]*\))?|type)[ \t]+([A-Z]\w*)"));

/// Python, JavaScript/TypeScript, shell, Ruby, Go, and Rust.
pub struct ScriptExtractor;

impl Extractor for ScriptExtractor {
    fn name(&self) -> &'static str {
        "script"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Script
    }

    fn claims(&self) -> Claims {
        Claims {
            extensions: &[
                "py", "pyw", "js", "mjs", "cjs", "jsx", "ts", "tsx", "d.ts", "sh", "bash", "zsh",
                "rb", "go", "rs",
            ],
            file_names: &["Rakefile", "Gemfile"],
            interpreters: &[
                "python", "node", "deno", "bun", "ts-node", "bash", "zsh", "sh", "ruby",
            ],
        }
    }

    fn extract(&self, path: &Path, content: &str) -> FactSet {
        let language = language_of(path, content);
        let mut facts = FactSet::for_language(language);
        match language {
            "python" => python(content, &mut facts),
            "javascript" | "typescript" => javascript(content, &mut facts),
            "shell" => shell(content, &mut facts),
            "ruby" => ruby(content, &mut facts),
            "go" => go(content, &mut facts),
            "rust" => rust(content, &mut facts),
            _ => {}
        }
        common::scan_ports(content, &mut facts);
        facts
    }
}

/// Language label for a script path, falling back to the `#!` interpreter.
#[must_use]
pub fn language_of(path: &Path, content: &str) -> &'static str {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name == "rakefile" || name == "gemfile" {
        return "ruby";
    }
    let by_extension = LANGUAGES
        .iter()
        .filter(|(ext, _)| name.ends_with(&format!(".{ext}")))
        .max_by_key(|(ext, _)| ext.len())
        .map(|(_, lang)| *lang);
    by_extension
        .or_else(|| {
            let interpreter = common::shebang_interpreter(content)?;
            INTERPRETERS
                .iter()
                .find(|(i, _)| interpreter.starts_with(i))
                .map(|(_, l)| *l)
        })
        .unwrap_or("script")
}

fn python(content: &str, facts: &mut FactSet) {
    for cap in PY_IMPORT.captures_iter(content) {
        for module in cap[1].split(',') {
            let module = module.split_whitespace().next().unwrap_or_default();
            facts.add_import(module);
        }
    }
    for cap in PY_FROM.captures_iter(content) {
        let (dots, module) = (&cap[1], &cap[2]);
        if module.is_empty() {
            for name in cap[3].split(',') {
                facts.add_import(name.split_whitespace().next().unwrap_or_default());
            }
        } else {
            facts.add_import(&format!("{dots}{module}"));
        }
    }
    for cap in PY_DEF.captures_iter(content) {
        facts.add_export(&cap[1]);
    }
    if content.matches("\"\"\"").count() % 2 == 1 || content.matches("'''").count() % 2 == 1 {
        facts.mark_incomplete("unterminated triple-quoted string");
    }
    let purpose = common::leading_comment(content, CommentStyle::Python, facts);
    facts.purpose = purpose;
}

fn javascript(content: &str, facts: &mut FactSet) {
    for re in [&*JS_IMPORT, &*JS_REQUIRE] {
        for cap in re.captures_iter(content) {
            facts.add_import(&cap[1]);
        }
    }
    for re in [&*JS_EXPORT, &*JS_TOP_LEVEL, &*JS_COMMONJS] {
        for cap in re.captures_iter(content) {
            facts.add_export(&cap[1]);
        }
    }
    check_block_comments(content, facts);
    let purpose = common::leading_comment(content, CommentStyle::Slash, facts);
    facts.purpose = purpose;
}

/// Inline `<script>` bodies reuse the JavaScript rules.
pub(crate) fn javascript_fragment(content: &str, facts: &mut FactSet) {
    for re in [&*JS_IMPORT, &*JS_REQUIRE] {
        for cap in re.captures_iter(content) {
            facts.add_import(&cap[1]);
        }
    }
    for re in [&*JS_EXPORT, &*JS_TOP_LEVEL] {
        for cap in re.captures_iter(content) {
            facts.add_export(&cap[1]);
        }
    }
}

fn shell(content: &str, facts: &mut FactSet) {
    for cap in SH_SOURCE.captures_iter(content) {
        facts.add_import(&cap[1]);
    }
    common::scan_command_refs(content, facts);
    for cap in SH_FUNCTION.captures_iter(content) {
        facts.add_export(&cap[1]);
    }
    let purpose = common::leading_comment(content, CommentStyle::Hash, facts);
    facts.purpose = purpose;
}

fn ruby(content: &str, facts: &mut FactSet) {
    for cap in RB_REQUIRE.captures_iter(content) {
        facts.add_import(&cap[1]);
    }
    for cap in RB_DEF.captures_iter(content) {
        facts.add_export(&cap[1]);
    }
    let purpose = common::leading_comment(content, CommentStyle::Hash, facts);
    facts.purpose = purpose;
}

fn go(content: &str, facts: &mut FactSet) {
    for cap in GO_IMPORT_LINE.captures_iter(content) {
        facts.add_import(&cap[1]);
    }
    for block in GO_IMPORT_BLOCK.captures_iter(content) {
        for cap in QUOTED.captures_iter(&block[1]) {
            facts.add_import(&cap[1]);
        }
    }
    for cap in GO_EXPORT.captures_iter(content) {
        facts.add_export(&cap[1]);
    }
    check_block_comments(content, facts);
    let purpose = common::leading_comment(content, CommentStyle::Slash, facts);
    facts.purpose = purpose;
}

fn rust(content: &str, facts: &mut FactSet) {
    for line in content.lines() {
        let trimmed = line.trim();
        let item = trimmed.strip_prefix("pub ").unwrap_or(trimmed);
        if let Some(rest) = item.strip_prefix("use ") {
            let path = rest.split(['{', ';', ' ']).next().unwrap_or_default();
            facts.add_import(path.trim_end_matches("::"));
        } else if let Some(rest) = item.strip_prefix("mod ") {
            if let Some(name) = rest.strip_suffix(';') {
                facts.add_import(name.trim());
            }
        }

        let Some(public) = trimmed.strip_prefix("pub ") else {
            continue;
        };
        let public = public.strip_prefix("async ").unwrap_or(public);
        for keyword in ["fn ", "struct ", "enum ", "trait ", "type ", "const ", "static "] {
            if let Some(rest) = public.strip_prefix(keyword) {
                if let Some(name) = rest.split([' ', '{', '(', '<', ':', ';', '=']).next() {
                    facts.add_export(name);
                }
                break;
            }
        }
    }
    check_block_comments(content, facts);
    let purpose = common::leading_comment(content, CommentStyle::Slash, facts);
    facts.purpose = purpose;
}

fn check_block_comments(content: &str, facts: &mut FactSet) {
    if let Some(open) = content.rfind("/*") {
        if !content[open..].contains("*/") {
            facts.mark_incomplete("unterminated block comment");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(path: &str, content: &str) -> FactSet {
        ScriptExtractor.extract(Path::new(path), content)
    }

    #[test]
    fn python_imports_exports_and_docstring() {
        let facts = run(
            "chat/server.py",
            "\"\"\"WebSocket chat server.\"\"\"\nimport os, sys as system\nfrom .models import Room\nfrom . import auth\n\nclass Hub:\n    def inner(self): pass\n\nasync def serve():\n    pass\n",
        );
        assert_eq!(facts.language, "python");
        assert_eq!(facts.imports, vec!["os", "sys", ".models", "auth"]);
        assert_eq!(facts.exports, vec!["Hub", "serve"]);
        assert_eq!(facts.purpose.as_deref(), Some("WebSocket chat server."));
        assert!(!facts.incomplete);
    }

    #[test]
    fn python_unterminated_docstring_is_partial() {
        let facts = run("a.py", "\"\"\"never ends\ndef f(): pass\n");
        assert!(facts.incomplete);
        assert_eq!(facts.exports, vec!["f"]);
    }

    #[test]
    fn javascript_module_forms() {
        let facts = run(
            "web/app.js",
            "// Front door for the API.\nimport express from 'express';\nimport { a, b } from \"./lib/util\";\nconst db = require('./db');\nexport function start() {}\nexport default class Server {}\nexports.helper = 1;\nfunction local() {}\napp.listen(3000);\n",
        );
        assert_eq!(facts.imports, vec!["express", "./lib/util", "./db"]);
        assert_eq!(facts.exports, vec!["start", "Server", "local", "helper"]);
        assert_eq!(facts.purpose.as_deref(), Some("Front door for the API."));
        assert!(facts.listen_ports.contains(&3000));
    }

    #[test]
    fn typescript_declarations() {
        let source = "export interface User { id: string }\nexport type Id = string;\n";
        let facts = run("types.d.ts", source);
        assert_eq!(facts.language, "typescript");
        assert_eq!(facts.exports, vec!["User", "Id"]);
    }

    #[test]
    fn shell_sources_and_commands() {
        let facts = run(
            "run.sh",
            "#!/bin/bash\n# Starts everything.\nsource ./env.sh\nstart() {\n  python3 server.py --port 8000\n}\n",
        );
        assert_eq!(facts.imports, vec!["./env.sh", "server.py"]);
        assert_eq!(facts.exports, vec!["start"]);
        assert_eq!(facts.purpose.as_deref(), Some("Starts everything."));
        assert!(facts.listen_ports.contains(&8000));
    }

    #[test]
    fn shebang_only_script() {
        let facts = run("bin/serve", "#!/usr/bin/env node\nconst http = require('http');\n");
        assert_eq!(facts.language, "javascript");
        assert_eq!(facts.imports, vec!["http"]);
    }

    #[test]
    fn ruby_and_go() {
        let rb = run("app.rb", "require 'sinatra'\nrequire_relative 'lib/auth'\ndef ready?\nend\n");
        assert_eq!(rb.imports, vec!["sinatra", "lib/auth"]);
        assert_eq!(rb.exports, vec!["ready?"]);

        let go = run(
            "main.go",
            "package main\n\nimport (\n\t\"fmt\"\n\tlog \"github.com/x/log\"\n)\nimport \"os\"\n\nfunc Serve() {}\nfunc (s *S) Handle() {}\nfunc private() {}\ntype Config struct{}\n",
        );
        assert_eq!(go.imports, vec!["os", "fmt", "github.com/x/log"]);
        assert_eq!(go.exports, vec!["Serve", "Handle", "Config"]);
    }

    #[test]
    fn rust_public_items_and_uses() {
        let facts = run(
            "src/lib.rs",
            "//! Storage engine.\nmod cache;\npub use crate::cache::Cache;\nuse std::collections::{HashMap, BTreeMap};\n\npub fn open() {}\npub struct Store {}\npub async fn flush() {}\nfn hidden() {}\n",
        );
        assert_eq!(
            facts.imports,
            vec!["cache", "crate::cache::Cache", "std::collections"]
        );
        assert_eq!(facts.exports, vec!["open", "Store", "flush"]);
        assert_eq!(facts.purpose.as_deref(), Some("Storage engine."));
    }

    #[test]
    fn unterminated_block_comment_is_partial() {
        let facts = run("a.js", "const x = 1;\n/* trailing");
        assert!(facts.incomplete);
    }
}
