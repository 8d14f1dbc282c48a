//! Post-build HTML cleanup.
//!
//! Runs over every banner page in the build output before packaging:
//!
//! 1. Strip generator scoping attributes (`data-bf-cid-*`, `data-astro-cid-*`)
//!    from tags, with or without a value, and from CSS attribute selectors.
//! 2. Drop empty attribute values (`alt=""` → `alt`).
//! 3. Merge every `<style>` block into one, inserted right before `</head>`,
//!    in source order. Empty blocks disappear.
//! 4. Reformat: one tag per line, two-space indentation, text-only elements
//!    kept on one line, `<script>`/`<style>` bodies re-indented as a block,
//!    `<pre>`/`<textarea>` bodies left exactly as written.
//!
//! The whole pass is idempotent: cleaning clean output changes nothing. The
//! root preview `index.html` is left alone.

use crate::config::CleanConfig;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid scope prefix pattern: {0}")]
    Regex(#[from] regex::Error),
    #[error("Build output not found: {0} (run `build` first)")]
    MissingOutput(PathBuf),
}

/// What cleaning changed in one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub scope_attributes: usize,
    pub scope_selectors: usize,
    pub empty_values: usize,
    pub style_blocks: usize,
}

impl CleanStats {
    fn add(&mut self, other: CleanStats) {
        self.scope_attributes += other.scope_attributes;
        self.scope_selectors += other.scope_selectors;
        self.empty_values += other.empty_values;
        self.style_blocks += other.style_blocks;
    }
}

#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    /// Pages rewritten, relative to the output directory.
    pub changed: Vec<PathBuf>,
    /// Pages already clean.
    pub unchanged: usize,
    pub totals: CleanStats,
}

pub struct Cleaner {
    tag: Regex,
    scope_attr: Option<Regex>,
    scope_selector: Option<Regex>,
    empty_value: Regex,
    style_block: Regex,
    merge_styles: bool,
}

impl Cleaner {
    pub fn new(config: &CleanConfig) -> Result<Self, CleanError> {
        let (scope_attr, scope_selector) = if config.scope_prefixes.is_empty() {
            (None, None)
        } else {
            let names = config
                .scope_prefixes
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            (
                Some(Regex::new(&format!(
                    r#"\s+(?:{names})[\w-]*(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>"']+))?"#
                ))?),
                Some(Regex::new(&format!(
                    r#"\[(?:{names})[\w-]*(?:=(?:"[^"]*"|'[^']*'|[^\]]*))?\]"#
                ))?),
            )
        };
        Ok(Self {
            tag: Regex::new(r"<[a-zA-Z][^>]*>")?,
            scope_attr,
            scope_selector,
            empty_value: Regex::new(r#"=""(\s|/?>)"#)?,
            style_block: Regex::new(r"(?is)\s*<style\b[^>]*>(.*?)</style\s*>")?,
            merge_styles: config.merge_styles,
        })
    }

    /// Clean one document.
    pub fn clean(&self, html: &str) -> (String, CleanStats) {
        let mut stats = CleanStats::default();
        let mut out = html.replace("\r\n", "\n");

        if let Some(selector) = &self.scope_selector {
            stats.scope_selectors = selector.find_iter(&out).count();
            out = selector.replace_all(&out, "").into_owned();
        }

        out = self
            .tag
            .replace_all(&out, |caps: &regex::Captures| {
                let mut tag = caps[0].to_string();
                if let Some(attr) = &self.scope_attr {
                    stats.scope_attributes += attr.find_iter(&tag).count();
                    tag = attr.replace_all(&tag, "").into_owned();
                }
                stats.empty_values += self.empty_value.find_iter(&tag).count();
                self.empty_value.replace_all(&tag, "$1").into_owned()
            })
            .into_owned();

        if self.merge_styles {
            let (merged, blocks) = self.merge_style_blocks(&out);
            out = merged;
            stats.style_blocks = blocks;
        }

        (format_html(&out), stats)
    }

    /// Pull every style block out and reinsert one combined block before
    /// `</head>`. Documents without a head are left as they are.
    fn merge_style_blocks(&self, html: &str) -> (String, usize) {
        let lower = html.to_ascii_lowercase();
        if !lower.contains("</head>") {
            return (html.to_string(), 0);
        }
        let bodies: Vec<String> = self
            .style_block
            .captures_iter(html)
            .map(|c| dedent(&c[1]))
            .collect();
        if bodies.is_empty() {
            return (html.to_string(), 0);
        }
        let count = bodies.len();
        let css = bodies
            .into_iter()
            .filter(|b| !b.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let stripped = self.style_block.replace_all(html, "").into_owned();
        let Some(pos) = stripped.to_ascii_lowercase().find("</head>") else {
            return (html.to_string(), 0);
        };
        let merged = if css.is_empty() {
            stripped
        } else {
            format!(
                "{}<style>\n{css}\n</style>\n{}",
                &stripped[..pos],
                &stripped[pos..]
            )
        };
        (merged, count)
    }
}

/// Clean every banner page under `output_dir`.
pub fn clean_dir(output_dir: &Path, config: &CleanConfig) -> Result<CleanReport, CleanError> {
    if !output_dir.is_dir() {
        return Err(CleanError::MissingOutput(output_dir.to_path_buf()));
    }
    let cleaner = Cleaner::new(config)?;
    let preview_index = output_dir.join("index.html");
    let mut report = CleanReport::default();

    let mut pages: Vec<PathBuf> = WalkDir::new(output_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|x| x.eq_ignore_ascii_case("html")))
        .filter(|p| *p != preview_index)
        .collect();
    pages.sort();

    for path in pages {
        let original = fs::read_to_string(&path)?;
        let (cleaned, stats) = cleaner.clean(&original);
        report.totals.add(stats);
        let rel = path
            .strip_prefix(output_dir)
            .unwrap_or(&path)
            .to_path_buf();
        if cleaned == original {
            report.unchanged += 1;
        } else {
            fs::write(&path, cleaned)?;
            tracing::debug!(page = %rel.display(), ?stats, "cleaned");
            report.changed.push(rel);
        }
    }
    Ok(report)
}

// ============================================================================
// Formatting
// ============================================================================

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose content is copied without tokenizing.
const RAW_ELEMENTS: [&str; 4] = ["script", "style", "pre", "textarea"];

/// Raw elements whose whitespace is content and is written back untouched.
const VERBATIM_ELEMENTS: [&str; 2] = ["pre", "textarea"];

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    /// Doctype, comment, void or self-closing tag.
    Line(&'a str),
    Open(&'a str),
    Close(&'a str),
    Text(&'a str),
    Raw {
        open: &'a str,
        body: &'a str,
        close: &'a str,
    },
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Index just past the `>` closing the tag starting at `start`, skipping
/// quoted attribute values.
fn tag_end(html: &str, start: usize) -> usize {
    let mut quote: Option<u8> = None;
    for (i, b) in html.bytes().enumerate().skip(start + 1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return i + 1,
            None => {}
        }
    }
    html.len()
}

fn tokenize(html: &str) -> Vec<Token<'_>> {
    let lower = html.to_ascii_lowercase();
    let bytes = html.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < html.len() {
        if html[i..].starts_with("<!--") {
            let end = html[i..].find("-->").map_or(html.len(), |e| i + e + 3);
            tokens.push(Token::Line(&html[i..end]));
            i = end;
            continue;
        }
        let is_tag = bytes[i] == b'<'
            && bytes
                .get(i + 1)
                .is_some_and(|c| c.is_ascii_alphabetic() || *c == b'/' || *c == b'!');
        if !is_tag {
            let from = if bytes[i] == b'<' { i + 1 } else { i };
            let end = html[from..].find('<').map_or(html.len(), |e| from + e);
            tokens.push(Token::Text(&html[i..end]));
            i = end;
            continue;
        }

        let end = tag_end(html, i);
        let tag = &html[i..end];
        let name = tag_name(tag);
        if tag.starts_with("</") {
            tokens.push(Token::Close(tag));
        } else if tag.starts_with("<!")
            || tag.ends_with("/>")
            || VOID_ELEMENTS.contains(&name.as_str())
        {
            tokens.push(Token::Line(tag));
        } else if RAW_ELEMENTS.contains(&name.as_str()) {
            let needle = format!("</{name}");
            let body_end = lower[end..].find(&needle).map_or(html.len(), |e| end + e);
            let close_end = if body_end < html.len() {
                tag_end(html, body_end)
            } else {
                html.len()
            };
            tokens.push(Token::Raw {
                open: tag,
                body: &html[end..body_end],
                close: &html[body_end..close_end],
            });
            i = close_end;
            continue;
        } else {
            tokens.push(Token::Open(tag));
        }
        i = end;
    }
    tokens
}

/// Drop leading and trailing blank lines, trim line ends, and strip the
/// indentation common to every non-blank line.
/// Only ASCII spaces and tabs count as indentation.
fn dedent(body: &str) -> String {
    let lines: Vec<&str> = body.lines().map(str::trim_end).collect();
    let first = lines.iter().position(|l| !l.is_empty());
    let last = lines.iter().rposition(|l| !l.is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };
    let lines = &lines[first..=last];
    let indent = lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.bytes().take_while(|b| *b == b' ' || *b == b'\t').count())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| if l.is_empty() { "" } else { &l[indent..] })
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic formatter. LF endings, no trailing whitespace, no blank
/// lines, single trailing newline. `<pre>` and `<textarea>` bodies are the
/// exception and are written back as they are.
pub fn format_html(html: &str) -> String {
    let tokens = tokenize(html);
    let mut lines: Vec<String> = Vec::new();
    let mut depth: usize = 0;
    let pad = |depth: usize| "  ".repeat(depth);
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            Token::Line(tag) => lines.push(format!("{}{}", pad(depth), collapse_whitespace(tag))),
            Token::Text(text) => {
                let text = collapse_whitespace(text);
                if !text.is_empty() {
                    lines.push(format!("{}{text}", pad(depth)));
                }
            }
            Token::Open(open) => match (tokens.get(i + 1), tokens.get(i + 2)) {
                (Some(Token::Close(close)), _) => {
                    lines.push(format!("{}{open}{close}", pad(depth)));
                    i += 1;
                }
                (Some(Token::Text(text)), Some(Token::Close(close))) => {
                    lines.push(format!(
                        "{}{open}{}{close}",
                        pad(depth),
                        collapse_whitespace(text)
                    ));
                    i += 2;
                }
                _ => {
                    lines.push(format!("{}{open}", pad(depth)));
                    depth += 1;
                }
            },
            Token::Close(close) => {
                depth = depth.saturating_sub(1);
                lines.push(format!("{}{close}", pad(depth)));
            }
            Token::Raw { open, body, close }
                if VERBATIM_ELEMENTS.contains(&tag_name(open).as_str()) =>
            {
                lines.push(format!("{}{open}{body}{close}", pad(depth)));
            }
            Token::Raw { open, body, close } => {
                let body = dedent(body);
                if body.is_empty() {
                    lines.push(format!("{}{open}{close}", pad(depth)));
                } else {
                    lines.push(format!("{}{open}", pad(depth)));
                    for line in body.lines() {
                        if line.is_empty() {
                            lines.push(String::new());
                        } else {
                            lines.push(format!("{}{line}", pad(depth + 1)));
                        }
                    }
                    lines.push(format!("{}{close}", pad(depth)));
                }
            }
        }
        i += 1;
    }

    collapse_blank_runs(&lines)
}

fn collapse_blank_runs(lines: &[String]) -> String {
    let mut out = String::new();
    let mut previous_blank = true;
    for line in lines {
        let blank = line.is_empty();
        if blank && previous_blank {
            continue;
        }
        out.push_str(line);
        out.push('\n');
        previous_blank = blank;
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    if out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load;
    use crate::render;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn cleaner() -> Cleaner {
        Cleaner::new(&CleanConfig::default()).unwrap()
    }

    const SCOPED: &str = r#"<!DOCTYPE html><html><head><title>T</title><style data-bf-cid-frame>.banner[data-bf-cid-frame] { color: red; }</style><style data-astro-cid-x7y="">.cta[data-astro-cid-x7y] { color: blue; }</style><style></style></head><body><div class="banner" data-bf-cid-frame><img src="/images/bg.jpg" alt="" data-astro-cid-x7y=""><h1 class="headline" data-bf-cid-copy>Big   sale</h1></div></body></html>"#;

    #[test]
    fn strips_scope_attributes_and_selectors() {
        let (html, stats) = cleaner().clean(SCOPED);
        assert!(!html.contains("data-bf-cid"), "{html}");
        assert!(!html.contains("data-astro-cid"), "{html}");
        assert!(html.contains(".banner { color: red; }"));
        assert!(html.contains(r#"<div class="banner">"#));
        assert_eq!(stats.scope_selectors, 2);
        assert_eq!(stats.scope_attributes, 5);
    }

    #[test]
    fn drops_empty_attribute_values() {
        let (html, _) = cleaner().clean(SCOPED);
        assert!(html.contains(r#"<img src="/images/bg.jpg" alt>"#), "{html}");
        assert!(!html.contains(r#"="""#));
    }

    #[test]
    fn merges_style_blocks_before_head_close() {
        let (html, stats) = cleaner().clean(SCOPED);
        assert_eq!(html.matches("<style>").count(), 1);
        assert_eq!(stats.style_blocks, 3);
        let style = html.find("<style>").unwrap();
        let head_close = html.find("</head>").unwrap();
        let title = html.find("<title>").unwrap();
        assert!(title < style && style < head_close);
        // source order preserved
        assert!(html.find(".banner {").unwrap() < html.find(".cta {").unwrap());
        // nothing but the closing style tag between the block and </head>
        assert!(html[style..head_close].trim_end().ends_with("</style>"));
    }

    #[test]
    fn merge_can_be_disabled() {
        let config = CleanConfig {
            merge_styles: false,
            ..CleanConfig::default()
        };
        let (html, stats) = Cleaner::new(&config).unwrap().clean(SCOPED);
        assert_eq!(stats.style_blocks, 0);
        assert_eq!(html.matches("<style").count(), 3);
    }

    #[test]
    fn formats_one_tag_per_line() {
        let (html, _) = cleaner().clean(SCOPED);
        assert!(html.starts_with("<!DOCTYPE html>\n<html>\n  <head>\n    <title>T</title>\n"));
        assert!(html.contains("\n      <h1 class=\"headline\">Big sale</h1>\n"));
        assert!(html.ends_with("</html>\n"));
        assert!(!html.contains("\n\n"));
        assert!(html.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn crlf_normalized() {
        let (html, _) = cleaner().clean("<html>\r\n<body>\r\n<p>hi</p>\r\n</body>\r\n</html>\r\n");
        assert!(!html.contains('\r'));
        assert_eq!(html, "<html>\n  <body>\n    <p>hi</p>\n  </body>\n</html>\n");
    }

    #[test]
    fn script_bodies_keep_relative_indentation() {
        let input = "<html><head></head><body><script>\n        if (a) {\n            go();\n        }\n</script></body></html>";
        let (html, _) = cleaner().clean(input);
        assert!(html.contains("    <script>\n      if (a) {\n          go();\n      }\n    </script>\n"), "{html}");
    }

    #[test]
    fn non_ascii_leading_whitespace_is_content() {
        let input = "<html><body><script>\n    a();\n\u{a0}b();\n    \u{a0}c();\n</script></body></html>";
        let (html, _) = cleaner().clean(input);
        assert!(html.contains("      a();\n"), "{html}");
        assert!(html.contains("\u{a0}b();\n"), "{html}");
        assert!(html.contains("      \u{a0}c();\n"), "{html}");

        let styled = "<html><head><style>\n .a{}\n\u{a0}.b{}\n</style></head><body></body></html>";
        let (html, _) = cleaner().clean(styled);
        assert!(html.contains(" .a{}\n"), "{html}");
        assert!(html.contains("\u{a0}.b{}\n"), "{html}");
    }

    #[test]
    fn pre_and_textarea_keep_their_whitespace() {
        let input = "<html><body><div><pre>  one\n      two\n\n\nthree</pre>\
                     <textarea>\n  a  b\n</textarea></div></body></html>";
        let (html, _) = cleaner().clean(input);
        assert!(html.contains("<pre>  one\n      two\n\n\nthree</pre>\n"), "{html}");
        assert!(html.contains("<textarea>\n  a  b\n</textarea>\n"), "{html}");

        let (again, _) = cleaner().clean(&html);
        assert_eq!(again, html);
    }

    #[test]
    fn cleaning_is_idempotent_on_strings() {
        let c = cleaner();
        let (once, _) = c.clean(SCOPED);
        let (twice, stats) = c.clean(&once);
        assert_eq!(once, twice);
        assert_eq!(stats.scope_attributes, 0);
        assert_eq!(stats.empty_values, 0);
    }

    #[test]
    fn custom_prefixes() {
        let config = CleanConfig {
            scope_prefixes: vec!["data-v-".into()],
            ..CleanConfig::default()
        };
        let (html, _) = Cleaner::new(&config)
            .unwrap()
            .clean(r#"<div data-v-12ab class="x" data-bf-cid-frame>t</div>"#);
        assert_eq!(html, "<div class=\"x\" data-bf-cid-frame>t</div>\n");
    }

    #[test]
    fn missing_output_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = clean_dir(&tmp.path().join("dist"), &CleanConfig::default()).unwrap_err();
        assert!(matches!(err, CleanError::MissingOutput(_)));
    }

    #[test]
    fn build_output_cleans_idempotently() {
        let tmp = setup_fixtures();
        let project = load::load(tmp.path()).unwrap();
        let out = TempDir::new().unwrap();
        render::render(&project, out.path()).unwrap();

        let first = clean_dir(out.path(), &project.config.clean).unwrap();
        assert_eq!(first.changed.len(), project.page_count());
        let snapshot = fs::read(out.path().join("banner/summer-sale/300x250.html")).unwrap();

        let second = clean_dir(out.path(), &project.config.clean).unwrap();
        assert!(second.changed.is_empty());
        assert_eq!(second.unchanged, project.page_count());
        assert_eq!(
            fs::read(out.path().join("banner/summer-sale/300x250.html")).unwrap(),
            snapshot
        );
    }

    #[test]
    fn preview_index_is_not_cleaned() {
        let tmp = setup_fixtures();
        let project = load::load(tmp.path()).unwrap();
        let out = TempDir::new().unwrap();
        render::render(&project, out.path()).unwrap();
        let before = fs::read_to_string(out.path().join("index.html")).unwrap();
        clean_dir(out.path(), &project.config.clean).unwrap();
        assert_eq!(fs::read_to_string(out.path().join("index.html")).unwrap(), before);
    }

    #[test]
    fn cleaned_page_keeps_runtime_hooks() {
        let tmp = setup_fixtures();
        let project = load::load(tmp.path()).unwrap();
        let out = TempDir::new().unwrap();
        render::render(&project, out.path()).unwrap();
        clean_dir(out.path(), &project.config.clean).unwrap();
        let html = fs::read_to_string(out.path().join("banner/summer-sale/728x90.html")).unwrap();
        assert!(html.contains("initBanner("));
        assert!(html.contains(r#"<meta name="ad.size" content="width=728,height=90">"#));
        assert!(!html.contains("data-bf-cid"));
    }
}
