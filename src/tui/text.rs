//! Text utilities for input editing and chat layout.

/// Find the start position of the word before the cursor.
///
/// Words are delimited by whitespace; punctuation is part of the word.
/// Returns 0 if cursor is at start or only whitespace precedes it.
pub fn find_word_start_backward(text: &str, cursor: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = cursor.min(chars.len());

    while pos > 0 && chars.get(pos - 1).is_some_and(|c| c.is_whitespace()) {
        pos -= 1;
    }

    while pos > 0 && chars.get(pos - 1).is_some_and(|c| !c.is_whitespace()) {
        pos -= 1;
    }

    pos
}

/// Wraps text to `width` columns.
///
/// Breaks at whitespace where possible and splits words longer than a line.
/// Embedded newlines are kept, tabs become four spaces, and an empty input
/// yields one empty line.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for raw in text.replace('\t', "    ").split('\n') {
        let mut current = String::new();
        let mut current_len = 0;
        let mut started = false;

        for word in raw.split(' ') {
            let word_len = word.chars().count();
            let sep = usize::from(started);

            if current_len + sep + word_len <= width {
                if started {
                    current.push(' ');
                }
                current.push_str(word);
                current_len += sep + word_len;
                started = true;
                continue;
            }

            if started {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
                started = false;
            }

            let mut chars = word.chars().peekable();
            while chars.peek().is_some() {
                let chunk: String = chars.by_ref().take(width).collect();
                let chunk_len = chunk.chars().count();
                if chunk_len == width && chars.peek().is_some() {
                    lines.push(chunk);
                } else {
                    current = chunk;
                    current_len = chunk_len;
                    started = true;
                }
            }
        }

        lines.push(current);
    }

    lines
}
