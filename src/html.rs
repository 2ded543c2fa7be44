//! HTML-safe fragments and the small set of tag builders the form builder needs.
//!
//! A [`SafeFragment`] can only be produced by escaping text, by the builders
//! in this module, or by joining other fragments. Buffers on the
//! [`BufferStack`](crate::stack::BufferStack) accept nothing else, so raw
//! user data can never reach the output unescaped.

use std::fmt;

/// Markup that is already safe to emit as HTML
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeFragment(String);

impl SafeFragment {
    /// An empty fragment
    pub fn new() -> Self {
        Self::default()
    }

    /// Escape plain text into a fragment
    pub fn escape(text: &str) -> Self {
        SafeFragment(escape_html(text))
    }

    /// Append another fragment
    pub fn push(&mut self, other: &SafeFragment) {
        self.0.push_str(&other.0);
    }

    /// Concatenate fragments in order
    pub fn join<'a, I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = &'a SafeFragment>,
    {
        let mut out = SafeFragment::new();
        for fragment in fragments {
            out.push(fragment);
        }
        out
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for SafeFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SafeFragment> for String {
    fn from(fragment: SafeFragment) -> Self {
        fragment.0
    }
}

/// Escape `& < > " '` for use in element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text for embedding inside a single- or double-quoted JavaScript string.
///
/// Line breaks collapse to `\n` and `</` becomes `<\/` so the result cannot
/// close an enclosing `<script>` element.
pub fn escape_javascript(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '`' => out.push_str("\\`"),
            '$' => out.push_str("\\$"),
            '<' if chars.peek() == Some(&'/') => {
                chars.next();
                out.push_str("<\\/");
            }
            _ => out.push(c),
        }
    }
    out
}

fn write_attributes(out: &mut String, attrs: &[(&str, &str)]) {
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_html(value));
        out.push('"');
    }
}

/// `<name attrs>inner</name>`
pub fn content_tag(name: &str, attrs: &[(&str, &str)], inner: &SafeFragment) -> SafeFragment {
    let mut out = String::with_capacity(inner.len() + name.len() * 2 + 5);
    out.push('<');
    out.push_str(name);
    write_attributes(&mut out, attrs);
    out.push('>');
    out.push_str(inner.as_str());
    out.push_str("</");
    out.push_str(name);
    out.push('>');
    SafeFragment(out)
}

/// A void element such as `<input ... />`
pub fn tag(name: &str, attrs: &[(&str, &str)]) -> SafeFragment {
    let mut out = String::from("<");
    out.push_str(name);
    write_attributes(&mut out, attrs);
    out.push_str(" />");
    SafeFragment(out)
}

/// `<a href="...">text</a>` with escaped text
pub fn link_to(text: &str, href: &str, attrs: &[(&str, &str)]) -> SafeFragment {
    let mut all: Vec<(&str, &str)> = Vec::with_capacity(attrs.len() + 1);
    all.push(("href", href));
    all.extend_from_slice(attrs);
    content_tag("a", &all, &SafeFragment::escape(text))
}
