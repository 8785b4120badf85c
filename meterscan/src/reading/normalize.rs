/// Map raw OCR text to a clean digit-only string.
///
/// Keeps digits and the glyphs Tesseract commonly confuses with them on
/// seven-segment and drum displays, substitutes those glyphs (`O` to `0`;
/// `I`, `|`, `[`, `]` to `1`), and drops everything else. Whitespace and
/// punctuation between digits are removed, so `"12 34"` becomes `"1234"`.
pub fn normalize_ocr_text(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .filter_map(|c| match c {
            '0'..='9' => Some(c),
            'O' => Some('0'),
            'I' | '|' | '[' | ']' => Some('1'),
            _ => None,
        })
        .collect();

    mapped
        .trim_matches(|c: char| !c.is_ascii_digit())
        .to_string()
}
