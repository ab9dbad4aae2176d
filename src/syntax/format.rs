//! Whitespace normalization for C source
//!
//! Re-indents by brace depth, collapses runs of whitespace in code, drops
//! trailing whitespace and squeezes blank lines. String literals, character
//! literals and comments are copied verbatim.

pub fn normalize_whitespace(source: &str, tab_width: usize) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut depth: usize = 0;
    let mut in_block_comment = false;
    let mut blank_pending = false;

    for line in source.lines() {
        let starts_in_comment = in_block_comment;
        let trimmed = line.trim();

        if trimmed.is_empty() && !starts_in_comment {
            if !out.is_empty() {
                blank_pending = true;
            }
            continue;
        }
        if blank_pending {
            out.push(String::new());
            blank_pending = false;
        }

        // Preprocessor lines stay at column 0
        if !starts_in_comment && trimmed.starts_with('#') {
            out.push(trimmed.to_string());
            continue;
        }

        let norm = normalize_line(trimmed, &mut in_block_comment);
        if norm.text.is_empty() {
            out.push(String::new());
            continue;
        }

        let level = depth.saturating_sub(norm.leading_closers);
        let prefix = if starts_in_comment && norm.text.starts_with('*') {
            " "
        } else {
            ""
        };
        out.push(format!(
            "{}{}{}",
            " ".repeat(level * tab_width),
            prefix,
            norm.text
        ));

        depth = (depth as i64 + norm.delta).max(0) as usize;
    }

    if out.is_empty() {
        return String::new();
    }
    let mut text = out.join("\n");
    text.push('\n');
    text
}

struct NormalizedLine {
    text: String,
    /// Opening minus closing braces in code
    delta: i64,
    /// Closing braces before any other code on the line
    leading_closers: usize,
}

fn normalize_line(line: &str, in_block_comment: &mut bool) -> NormalizedLine {
    let mut text = String::with_capacity(line.len());
    let mut delta = 0i64;
    let mut leading_closers = 0;
    let mut seen_code = false;
    let mut pending_space = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if *in_block_comment {
            text.push(c);
            if c == '*' && chars.peek() == Some(&'/') {
                text.push('/');
                chars.next();
                *in_block_comment = false;
            }
            continue;
        }

        if let Some(q) = quote {
            text.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    text.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !text.is_empty() {
            text.push(' ');
        }
        pending_space = false;

        match c {
            '/' if chars.peek() == Some(&'/') => {
                text.push(c);
                text.extend(chars.by_ref());
                break;
            }
            '/' if chars.peek() == Some(&'*') => {
                text.push_str("/*");
                chars.next();
                *in_block_comment = true;
            }
            '"' | '\'' => {
                text.push(c);
                quote = Some(c);
                seen_code = true;
            }
            '{' => {
                text.push(c);
                delta += 1;
                seen_code = true;
            }
            '}' => {
                text.push(c);
                delta -= 1;
                if !seen_code {
                    leading_closers += 1;
                }
            }
            _ => {
                text.push(c);
                seen_code = true;
            }
        }
    }

    NormalizedLine {
        text: text.trim_end().to_string(),
        delta,
        leading_closers,
    }
}
