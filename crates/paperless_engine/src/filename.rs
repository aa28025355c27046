use chrono::NaiveDate;
use paperless_core::ConversionMode;

/// Filename for an artifact: the server's disposition name verbatim, else
/// `Converted_{category}_{YYYY-MM-DD}.{ext}`.
///
/// A disposition name that leaves nothing to save under (`"reports/"`, `".."`)
/// also gets the fallback.
pub fn resolve_filename(disposition: Option<&str>, mode: ConversionMode, date: NaiveDate) -> String {
    disposition
        .and_then(filename_from_disposition)
        .filter(|name| disk_safe_filename(name).is_some())
        .unwrap_or_else(|| fallback_filename(mode, date))
}

pub fn fallback_filename(mode: ConversionMode, date: NaiveDate) -> String {
    format!(
        "Converted_{}_{}.{}",
        mode.category(),
        date.format("%Y-%m-%d"),
        mode.output().extension()
    )
}

/// Extracts `filename="..."` (or the unquoted form) from a Content-Disposition value.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    parse_params(header)
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("filename"))
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

fn parse_params(header: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = header.chars().peekable();
    loop {
        // Skip to the next parameter; the disposition type itself has no '='.
        let mut key = String::new();
        let mut saw_eq = false;
        for c in chars.by_ref() {
            match c {
                '=' => {
                    saw_eq = true;
                    break;
                }
                ';' => key.clear(),
                _ => key.push(c),
            }
        }
        if !saw_eq {
            break;
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
            // Drop anything between the closing quote and the next ';'.
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
            }
        } else {
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
                value.push(c);
            }
            value = value.trim().to_string();
        }
        params.push((key.trim().to_string(), value));
    }
    params
}

/// Reduces a suggested filename to a single, Windows-safe path component.
pub fn disk_safe_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = last
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let mut cleaned = cleaned.trim_matches(&[' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        return None;
    }
    let stem = cleaned.split('.').next().unwrap_or(&cleaned);
    if is_reserved_windows_name(stem) {
        cleaned.insert(stem.len(), '_');
    }
    Some(cleaned)
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
