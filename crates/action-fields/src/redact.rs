pub const MASK: &str = "***";
pub const MAX_VALUE_LEN: usize = 64;

/// Loggable form of a field value
pub fn value(raw: &str, sensitive: bool) -> String {
    if sensitive {
        MASK.to_string()
    } else {
        truncate(raw, MAX_VALUE_LEN)
    }
}

pub fn truncate(raw: &str, max_chars: usize) -> String {
    match raw.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let mut trimmed = raw[..idx].to_string();
            trimmed.push('…');
            trimmed
        }
        None => raw.to_string(),
    }
}
