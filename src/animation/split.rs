//! Text splitting into visual lines.
//!
//! Headline and subhead copy is revealed line by line, so the planner needs to
//! know how many lines a piece of copy wraps into at a given size. In the
//! browser the runtime measures rendered height word by word; here we estimate
//! with per-glyph advance widths. Wrapping is greedy and never breaks a word:
//! a word wider than the line stands alone on its own line.

/// Approximate glyph metrics for a proportional sans-serif face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub font_size_px: f32,
}

impl FontMetrics {
    pub fn new(font_size_px: f32) -> Self {
        Self { font_size_px }
    }

    /// Estimated rendered width of `text` in pixels.
    pub fn text_width(&self, text: &str) -> f32 {
        text.chars().map(glyph_em).sum::<f32>() * self.font_size_px
    }
}

/// Advance width of one glyph in ems.
fn glyph_em(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | 't' | 'f' | 'r' | 'I' => 0.3,
        ' ' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => 0.3,
        'm' | 'w' => 0.8,
        'M' | 'W' => 0.9,
        '0'..='9' => 0.55,
        c if c.is_uppercase() => 0.65,
        _ => 0.5,
    }
}

/// Split `text` into lines no wider than `max_width_px`.
///
/// Runs of whitespace collapse to a single space, matching how HTML renders
/// the copy. Empty or whitespace-only text yields no lines.
pub fn split_lines(text: &str, max_width_px: f32, metrics: &FontMetrics) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if metrics.text_width(&candidate) > max_width_px {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
