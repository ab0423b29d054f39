//! Splits a stream of text lines into chapters.
//!
//! A header is a line starting with `#`, followed by whitespace and a title.
//! `#` opens a chapter, `##` opens a section. Anything deeper, and any header
//! that has no title, is kept as ordinary body text.

use tracing::debug;

/// Deepest header level that still opens a new chapter.
pub const MAX_LEVEL: usize = 2;

const MARKER: char = '#';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    level: usize,
    lines: Vec<String>,
}

impl Chapter {
    pub fn new(title: impl Into<String>, level: usize) -> Self {
        Self {
            title: title.into(),
            level,
            lines: Vec::new(),
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    /// Builder-style variant of [`Chapter::push_line`], mostly handy in tests.
    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    /// Renders the chapter as an XHTML fragment: one heading, then one
    /// paragraph per body line. Text is embedded as-is, without escaping.
    pub fn render(&self) -> String {
        let mut out = format!("<h{0}>{1}</h{0}>", self.level, self.title);
        for line in &self.lines {
            out.push_str("<p>");
            out.push_str(line);
            out.push_str("</p>");
        }
        out
    }
}

enum LineKind<'a> {
    Body(&'a str),
    Header { title: &'a str, level: usize },
}

fn classify(line: &str) -> LineKind<'_> {
    if !line.starts_with(MARKER) {
        return LineKind::Body(line);
    }

    let Some((marker, rest)) = line.split_once(char::is_whitespace) else {
        return LineKind::Body(line.trim_start_matches(MARKER));
    };

    let level = marker.chars().count();
    if level > MAX_LEVEL {
        return LineKind::Body(line);
    }

    LineKind::Header {
        title: rest.trim_start(),
        level,
    }
}

/// Splits `text` on `\n`, `\r\n` and lone `\r`, without the terminators.
/// A trailing terminator does not produce an extra empty line.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let (line, tail) = match rest.find(|c: char| c == '\r' || c == '\n') {
            Some(i) if rest[i..].starts_with("\r\n") => (&rest[..i], &rest[i + 2..]),
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };
        rest = tail;
        Some(line)
    })
}

/// Segments `lines` into chapters, in input order.
///
/// Lines that appear before the first header are not attached to any
/// chapter and do not show up in the result.
pub fn parse_text<I, S>(lines: I) -> Vec<Chapter>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut chapters: Vec<Chapter> = Vec::new();
    let mut preamble = 0usize;

    for raw in lines {
        let line = raw.as_ref().trim();

        match classify(line) {
            LineKind::Header { title, level } => chapters.push(Chapter::new(title, level)),
            LineKind::Body(text) => match chapters.last_mut() {
                Some(current) => {
                    current.push_line(text);
                }
                None => preamble += 1,
            },
        }
    }

    if preamble > 0 {
        debug!("Discarded {} line(s) before the first header", preamble);
    }
    debug!("Segmented {} chapters", chapters.len());

    chapters
}
