//! Cover letter formatting: newline-delimited backend text → ordered paragraphs.

/// A generated letter as it appears in the result region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLetter {
    paragraphs: Vec<String>,
}

impl RenderedLetter {
    /// Splits on `\n`, trims each line, drops blank ones. Order is preserved.
    pub fn from_cover_letter(cover_letter: &str) -> Self {
        let paragraphs = cover_letter
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        Self { paragraphs }
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    /// One `<p>` per paragraph, concatenated, with text escaped.
    pub fn to_html(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| format!("<p>{}</p>", escape_html(p)))
            .collect()
    }

    /// What a reader copies out of the region: paragraphs separated by a blank line.
    pub fn plain_text(&self) -> String {
        self.paragraphs.join("\n\n")
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
