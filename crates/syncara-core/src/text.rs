//! String helpers shared by the reply and handler paths.

/// Maximum length of a single Telegram text message, in characters.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Truncates to at most `max_chars` characters, appending `…` when cut.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Splits text into chunks no longer than `max_chars`, preferring line breaks.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max_chars {
            // Hard-split an overlong line
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("halo", 10), "halo");
        assert_eq!(truncate("halo dunia", 5), "halo…");
        assert_eq!(truncate("ééééé", 3).chars().count(), 3);
    }

    #[test]
    fn test_split_prefers_lines() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = split_message(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n".to_string(), "cccc".to_string()]);
    }

    #[test]
    fn test_split_long_line() {
        let text = "x".repeat(25);
        let chunks = split_message(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 5);
    }

    #[test]
    fn test_split_short() {
        assert_eq!(split_message("hi", MAX_MESSAGE_LEN), vec!["hi".to_string()]);
        assert!(split_message("", MAX_MESSAGE_LEN).is_empty());
    }
}
