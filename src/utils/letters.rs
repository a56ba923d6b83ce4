/// Choice labels `A..` for a group of `count` options. Non-positive counts
/// produce an empty list.
pub fn option_letters(count: i32) -> Vec<char> {
    (0..count.clamp(0, 26) as u8).map(|i| (b'A' + i) as char).collect()
}

/// Parses a single choice label, accepting lower case and surrounding spaces.
pub fn parse_letter(raw: &str) -> Option<char> {
    let mut chars = raw.trim().chars();
    let c = chars.next()?;
    if chars.next().is_some() || !c.is_ascii_alphabetic() {
        return None;
    }
    Some(c.to_ascii_uppercase())
}

pub fn letter_in_range(letter: char, options_count: i32) -> bool {
    let idx = letter as i32 - 'A' as i32;
    (0..options_count).contains(&idx)
}
