//! BBCode to Markdown conversion for descriptions imported from old databases.
//!
//! Tags without a Markdown equivalent (`[u]`, `[color]`, `[size]`) become
//! inline HTML, which Markdown passes through.

use regex::{Captures, Regex};

use crate::error::Result;

/// Nested tags are resolved one level per pass.
const MAX_PASSES: usize = 8;

/// Marks a protected code block; never produced by user text.
const CODE_MARK: char = '\u{1}';

pub struct BbCodeConverter {
    code: Regex,
    restore: Regex,
    inline: Vec<(Regex, &'static str)>,
    heading: Regex,
    quote: Regex,
    list: Regex,
}

impl BbCodeConverter {
    pub fn new() -> Result<Self> {
        let inline = [
            (r"(?is)\[b\](.*?)\[/b\]", "**${1}**"),
            (r"(?is)\[i\](.*?)\[/i\]", "_${1}_"),
            (r"(?is)\[s\](.*?)\[/s\]", "~~${1}~~"),
            (r"(?is)\[u\](.*?)\[/u\]", "<u>${1}</u>"),
            (
                r"(?is)\[color=([#\w]+)\](.*?)\[/color\]",
                r#"<span style="color: ${1}">${2}</span>"#,
            ),
            (
                r"(?is)\[size=(\d+)\](.*?)\[/size\]",
                r#"<span style="font-size: ${1}px">${2}</span>"#,
            ),
            (r"(?is)\[url\](.*?)\[/url\]", "<${1}>"),
            (r"(?is)\[url=([^\]]+)\](.*?)\[/url\]", "[${2}](${1})"),
            (r"(?is)\[img\](.*?)\[/img\]", "![](${1})"),
        ]
        .into_iter()
        .map(|(pattern, template)| Ok((Regex::new(pattern)?, template)))
        .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            code: Regex::new(r"(?is)\[code(?:=\w+)?\](.*?)\[/code\]")?,
            restore: Regex::new("\u{1}(\\d+)\u{1}")?,
            inline,
            heading: Regex::new(r"(?is)\[h([1-6])\](.*?)\[/h[1-6]\]")?,
            quote: Regex::new(r"(?is)\[quote(?:=([^\]]+))?\](.*?)\[/quote\]")?,
            list: Regex::new(r"(?is)\[list(=[1aAiI])?\](.*?)\[/list\]")?,
        })
    }

    /// Convert `bbcode` to Markdown. Unknown tags are left as they are.
    pub fn convert(&self, bbcode: &str) -> String {
        let mut blocks = Vec::new();
        let mut text = self
            .code
            .replace_all(bbcode, |caps: &Captures<'_>| {
                blocks.push(caps[1].trim_matches('\n').to_string());
                format!("{}{}{}", CODE_MARK, blocks.len() - 1, CODE_MARK)
            })
            .into_owned();

        for _ in 0..MAX_PASSES {
            let next = self.pass(&text);
            if next == text {
                break;
            }
            text = next;
        }

        self.restore
            .replace_all(&text, |caps: &Captures<'_>| {
                let index: usize = caps[1].parse().unwrap_or(usize::MAX);
                match blocks.get(index) {
                    Some(code) => format!("```\n{}\n```", code),
                    None => String::new(),
                }
            })
            .into_owned()
    }

    fn pass(&self, input: &str) -> String {
        let mut text = input.to_string();
        for (regex, template) in &self.inline {
            text = regex.replace_all(&text, *template).into_owned();
        }

        text = self
            .heading
            .replace_all(&text, |caps: &Captures<'_>| {
                let level: usize = caps[1].parse().unwrap_or(1);
                format!("{} {}", "#".repeat(level), caps[2].trim())
            })
            .into_owned();

        text = self
            .quote
            .replace_all(&text, |caps: &Captures<'_>| {
                let mut lines = Vec::new();
                if let Some(author) = caps.get(1) {
                    lines.push(format!("> {} wrote:", author.as_str().trim_matches('"')));
                }
                lines.extend(caps[2].trim().lines().map(|l| format!("> {}", l)));
                lines.join("\n")
            })
            .into_owned();

        self.list
            .replace_all(&text, |caps: &Captures<'_>| {
                let ordered = caps.get(1).is_some();
                caps[2]
                    .split("[*]")
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .enumerate()
                    .map(|(i, item)| {
                        if ordered {
                            format!("{}. {}", i + 1, item)
                        } else {
                            format!("- {}", item)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .into_owned()
    }
}
