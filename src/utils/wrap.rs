//! Word wrapping for transcript rendering.
//!
//! The transcript is pre-wrapped into explicit lines and rendered without
//! ratatui's own wrapping, so the scroll math always agrees with what is on
//! screen.

use unicode_width::UnicodeWidthChar;

/// Wrap `text` to `width` display columns. Explicit newlines are kept, words
/// are moved whole to the next line when they fit there, and words wider than
/// a full line are split. An empty input yields one empty line.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        wrap_paragraph(paragraph.trim_end_matches('\r'), width, &mut lines);
    }
    lines
}

fn wrap_paragraph(paragraph: &str, width: usize, out: &mut Vec<String>) {
    let mut line = String::new();
    let mut line_width = 0usize;

    for word in split_keeping_spaces(paragraph) {
        let word_width = display_width(word);
        let is_space = word.starts_with(' ');

        if line_width + word_width <= width {
            line.push_str(word);
            line_width += word_width;
            continue;
        }

        if is_space {
            // Whitespace that overflows becomes the break itself.
            if line_width > 0 {
                out.push(std::mem::take(&mut line));
                line_width = 0;
            }
            continue;
        }

        if line_width > 0 && word_width <= width {
            out.push(std::mem::take(&mut line).trim_end().to_string());
            line.push_str(word);
            line_width = word_width;
            continue;
        }

        for ch in word.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if line_width + ch_width > width && line_width > 0 {
                out.push(std::mem::take(&mut line));
                line_width = 0;
            }
            line.push(ch);
            line_width += ch_width;
        }
    }

    out.push(line);
}

/// Split into alternating runs of spaces and non-spaces.
fn split_keeping_spaces(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (idx, ch) in text.char_indices() {
        let is_space = ch == ' ';
        match in_space {
            Some(prev) if prev != is_space => {
                parts.push(&text[start..idx]);
                start = idx;
            }
            _ => {}
        }
        in_space = Some(is_space);
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    parts
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(|ch| ch.width().unwrap_or(0)).sum()
}
