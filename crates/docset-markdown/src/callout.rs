//! Fenced code blocks with callouts.
//!
//! Two annotation styles are recognized on individual code lines:
//!
//! - classic: one or more trailing `<N>` markers, explained by the numbered
//!   list that follows the code block.
//! - inline: a trailing ` // text` or ` # text` comment, rendered as its own
//!   numbered list under the code block.
//!
//! A block may only use one style. Blocks fenced with more than three
//! backticks are never annotated.

use std::sync::LazyLock;

use docset_diagnostics::FileEmitter;
use regex::Regex;

use crate::slug::escape_html;
use crate::substitution::Substitutions;

static CLASSIC_CALLOUTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\s*<\d+>)+\s*$").unwrap());
static CALLOUT_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<(\d+)>").unwrap());

/// Lines this long or longer are never scanned for inline annotations.
const MAX_INLINE_ANNOTATION_LINE: usize = 200;
const TAB_WIDTH: usize = 4;

/// Known highlighter languages and aliases, lowercase and sorted.
const LANGUAGES: &[&str] = &[
    "1c", "abnf", "accesslog", "actionscript", "ada", "adoc", "angelscript", "apache",
    "apacheconf", "applescript", "arcade", "arduino", "arm", "armasm", "as", "asc", "asciidoc",
    "aspectj", "atom", "autohotkey", "autoit", "avrasm", "awk", "axapta", "bash", "basic",
    "bat", "bf", "bind", "bnf", "brainfuck", "c", "c++", "cal", "capnp", "capnproto", "cc",
    "clj", "clojure", "cls", "cmake", "cmake.in", "cmd", "coffee", "coffeescript", "console",
    "coq", "cos", "cpp", "cr", "craftcms", "crm", "crmsh", "crystal", "cs", "csharp", "cson",
    "csp", "css", "cts", "cxx", "d", "dart", "dfm", "diff", "django", "dns", "docker",
    "dockerfile", "dos", "dpr", "dsconfig", "dst", "dts", "dust", "ebnf", "elixir", "elm",
    "eql", "erl", "erlang", "esql", "excel", "f90", "f95", "fix", "fortran", "fs", "fsharp",
    "fsi", "fsscript", "fsx", "gams", "gauss", "gawk", "gcode", "gemspec", "gherkin", "gms",
    "go", "golang", "golo", "gololang", "gql", "gradle", "graph", "graphql", "groovy", "gss",
    "gyp", "h", "h++", "haml", "handlebars", "haskell", "haxe", "hbs", "hh", "hpp", "hs",
    "html", "html.handlebars", "html.hbs", "http", "https", "hx", "hxx", "hy", "hylang", "i7",
    "iced", "inform7", "ini", "ino", "instances", "irb", "irpf90", "java", "javascript",
    "jinja", "jl", "js", "json", "jsonc", "jsp", "jsx", "julia", "julia-repl", "k", "kdb",
    "kotlin", "kt", "lasso", "lassoscript", "ldif", "leaf", "less", "lisp", "livecodeserver",
    "livescript", "ls", "lua", "mak", "make", "makefile", "markdown", "mathematica", "matlab",
    "mawk", "maxima", "md", "mel", "mercury", "mips", "mipsasm", "mizar", "mk", "mkd",
    "mkdown", "ml", "mm", "mma", "mojolicious", "monkey", "moon", "moonscript", "mts", "n1ql",
    "nawk", "nc", "nginx", "nginxconf", "nim", "nimrod", "nix", "nsis", "obj-c", "obj-c++",
    "objc", "objective-c++", "objectivec", "ocaml", "openscad", "osascript", "oxygene", "p21",
    "parser3", "pas", "pascal", "patch", "pcmk", "perl", "pf", "pf.conf", "pgsql", "php", "pl",
    "plaintext", "plist", "pluto", "pm", "podspec", "pony", "postgres", "postgresql",
    "powershell", "pp", "processing", "profile", "prolog", "properties", "proto", "protobuf",
    "ps", "ps1", "puppet", "py", "pycon", "python", "python-repl", "qml", "r", "rb", "re",
    "reasonml", "rib", "rs", "rsl", "rss", "ruby", "ruleslanguage", "rust", "sas", "scad",
    "scala", "scheme", "sci", "scilab", "scss", "sh", "shell", "smali", "smalltalk", "sml",
    "sql", "st", "stan", "stanfuncs", "stata", "step", "stp", "styl", "stylus", "subunit",
    "svelte", "svg", "swift", "tao", "tap", "tcl", "tex", "text", "thor", "thrift", "tk",
    "toit", "toml", "tp", "ts", "tsx", "twig", "txt", "typescript", "v", "vala", "vb", "vbnet",
    "vbs", "vbscript", "verilog", "vhdl", "vim", "wl", "x++", "x86asm", "xhtml", "xjb", "xl",
    "xls", "xlsx", "xml", "xpath", "xq", "xqm", "xquery", "xsd", "xsl", "yaml", "yml", "zep",
    "zephir", "zone", "zsh",
];

/// Whether `language` is a known highlighter language or alias.
pub fn is_known_language(language: &str) -> bool {
    LANGUAGES
        .binary_search(&language.to_ascii_lowercase().as_str())
        .is_ok()
}

/// Language named by a fence info string.
///
/// The first word is the language, unless it is a directive-like `{name}`
/// in which case the rest of the info string is used. Console and terminal
/// flavours map onto the language used to highlight them.
pub(crate) fn code_language(info: &str) -> (String, String) {
    let info = info.trim();
    let raw = if info.contains('{') {
        info.split_once('}').map_or("", |(_, rest)| rest.trim())
    } else {
        info.split_whitespace().next().unwrap_or_default()
    };
    let mapped = match raw {
        "console" | "console-response" | "console-result" => "json",
        "terminal" => "bash",
        "painless" => "java",
        other => other,
    };
    (raw.to_owned(), mapped.to_owned())
}

/// A callout marker found on a code line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallOut {
    /// Number shown in the rendered marker.
    pub index: usize,
    /// Annotation text for inline callouts, empty for classic ones.
    pub text: String,
    pub inline: bool,
    /// 0-indexed line within the code block.
    pub line: usize,
    slice_start: usize,
}

/// A parsed fenced code block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnhancedCode {
    pub language: String,
    /// Request line of a `console` block, e.g. `GET /_search`.
    pub api_call_header: Option<String>,
    pub lines: Vec<String>,
    pub callouts: Vec<CallOut>,
}

impl EnhancedCode {
    /// Parse the body of a fenced code block starting on source `line`.
    pub(crate) fn parse(
        info: &str,
        content: &str,
        fence_len: usize,
        substitutions: &Substitutions,
        emitter: &FileEmitter,
        line: usize,
    ) -> Self {
        let (raw_language, language) = code_language(info);
        if !language.is_empty() && !is_known_language(&language) {
            emitter.warning_at_line(line, format!("Unknown language: {language}"));
        }

        let mut api_call_header = None;
        let mut lines = Vec::new();
        let mut callouts = Vec::new();
        let mut inline_index = 0;
        for (idx, source_line) in content.lines().enumerate() {
            if idx == 0 && raw_language == "console" {
                api_call_header = Some(source_line.trim().to_owned());
                continue;
            }
            let text = substitutions.replace(source_line);
            let line_no = lines.len();
            if fence_len <= 3 {
                let classic = classic_callouts(&text, line_no);
                if classic.is_empty() {
                    if let Some(callout) = inline_callout(&text, line_no, inline_index + 1) {
                        inline_index += 1;
                        callouts.push(callout);
                    }
                } else {
                    callouts.extend(classic);
                }
            }
            lines.push(text);
        }

        for callout in &callouts {
            let text = &mut lines[callout.line];
            if callout.slice_start <= text.len() {
                text.truncate(callout.slice_start);
                text.truncate(text.trim_end().len());
            }
        }

        let inline = callouts.iter().filter(|c| c.inline).count();
        if inline > 0 && inline < callouts.len() {
            emitter.error_at_line(line, "Both inline and classic callouts are not supported");
        }

        Self {
            language,
            api_call_header,
            lines,
            callouts,
        }
    }

    /// Whether callouts are explained inline rather than by a following list.
    pub fn has_inline_annotations(&self) -> bool {
        self.callouts.iter().any(|c| c.inline)
    }

    /// Number of distinct classic callout numbers.
    pub fn classic_callout_count(&self) -> usize {
        let mut indexes: Vec<usize> = self
            .callouts
            .iter()
            .filter(|c| !c.inline)
            .map(|c| c.index)
            .collect();
        indexes.sort_unstable();
        indexes.dedup();
        indexes.len()
    }

    /// Render as `<pre><code>`, followed by the annotation list for inline
    /// callouts.
    pub fn to_html(&self) -> String {
        let mut html = String::from(r#"<div class="highlight">"#);
        if let Some(header) = &self.api_call_header {
            html.push_str(&format!(
                r#"<div class="api-call-header">{}</div>"#,
                escape_html(header)
            ));
        }
        html.push_str("<pre>");
        if self.language.is_empty() {
            html.push_str("<code>");
        } else {
            html.push_str(&format!(
                r#"<code class="language-{}">"#,
                escape_html(&self.language)
            ));
        }

        let indent = common_indent(&self.lines);
        let last = self.lines.len().saturating_sub(1);
        for (idx, line) in self.lines.iter().enumerate() {
            if (idx == 0 || idx == last) && line.trim().is_empty() {
                continue;
            }
            html.push_str(&escape_html(strip_indent(line, indent)));
            for callout in self.callouts.iter().filter(|c| c.line == idx) {
                html.push_str(&format!(
                    r#"<span class="code-callout" data-index="{0}">{0}</span>"#,
                    callout.index
                ));
            }
            html.push('\n');
        }
        html.push_str("</code></pre></div>");

        if self.has_inline_annotations() {
            html.push_str(r#"<ol class="code-callouts">"#);
            for callout in self.callouts.iter().filter(|c| c.inline) {
                html.push_str(&format!("<li>{}</li>", escape_html(&callout.text)));
            }
            html.push_str("</ol>");
        }
        html
    }
}

fn classic_callouts(text: &str, line: usize) -> Vec<CallOut> {
    let has_marker = text.find('<').is_some_and(|i| i > 0) && text.ends_with('>');
    if !has_marker {
        return Vec::new();
    }
    let Some(group) = CLASSIC_CALLOUTS.find(text) else {
        return Vec::new();
    };
    let slice_start = last_comment(&text[..group.start()])
        .filter(|&i| i > 0)
        .unwrap_or(group.start());
    CALLOUT_NUMBER
        .captures_iter(group.as_str())
        .filter_map(|caps| caps[1].parse().ok())
        .map(|index| CallOut {
            index,
            text: String::new(),
            inline: false,
            line,
            slice_start,
        })
        .collect()
}

fn inline_callout(text: &str, line: usize, index: usize) -> Option<CallOut> {
    if text.len() >= MAX_INLINE_ANNOTATION_LINE {
        return None;
    }
    let start = last_comment(text).filter(|&i| i > 0)?;
    let annotation = text[start..]
        .trim_start()
        .trim_start_matches('/')
        .trim_start_matches('#')
        .trim();
    if annotation.is_empty() {
        return None;
    }
    Some(CallOut {
        index,
        text: annotation.to_owned(),
        inline: true,
        line,
        slice_start: start,
    })
}

fn last_comment(text: &str) -> Option<usize> {
    match (text.rfind(" // "), text.rfind(" # ")) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

fn common_indent(lines: &[String]) -> usize {
    lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indent_width(line))
        .min()
        .unwrap_or(0)
}

fn strip_indent(line: &str, indent: usize) -> &str {
    let mut removed = 0;
    for (i, c) in line.char_indices() {
        if removed >= indent || !(c == ' ' || c == '\t') {
            return &line[i..];
        }
        removed += if c == '\t' { TAB_WIDTH } else { 1 };
    }
    ""
}
