// Mis-decoded forms appear as they look after lowercasing ("‚Ä¢" -> "‚ä¢").
const BULLET_GLYPHS: [&str; 4] = ["•", "●", "‚ä¢", "‚óè"];
const SPACED_PUNCTUATION: [char; 5] = ['.', ',', '!', '?', '%'];

/// Cleans extracted text into the lowercase, single-spaced form the index stores.
///
/// Run-together words ("endOfLine") are split before lowercasing so the split
/// still has case information to work with.
pub fn normalize(raw: &str) -> String {
    let mut text = split_camel_case(raw).to_lowercase();

    for glyph in BULLET_GLYPHS {
        if text.contains(glyph) {
            text = text.replace(glyph, "\n- ");
        }
    }

    let text = space_before_punctuation(&text);
    normalize_whitespace(&text)
}

fn split_camel_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous: Option<char> = None;

    for ch in text.chars() {
        if ch.is_ascii_uppercase() && previous.is_some_and(|p| p.is_ascii_lowercase()) {
            out.push(' ');
        }
        out.push(ch);
        previous = Some(ch);
    }

    out
}

fn space_before_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut previous: Option<char> = None;

    for ch in text.chars() {
        if SPACED_PUNCTUATION.contains(&ch) && !previous.is_some_and(char::is_whitespace) {
            out.push(' ');
        }
        out.push(ch);
        previous = Some(ch);
    }

    out
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
