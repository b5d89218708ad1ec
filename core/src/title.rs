use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref SPACES: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref COLON: Regex = Regex::new(r"\s+:\s+").expect("valid regex");
}

/// Prefixes recognized as a namespace before the first `:`.
const NAMESPACES: &[&str] = &[
    "Category", "Talk", "User", "User talk", "Template", "Wikipedia", "File", "Image", "Help", "Portal", "MediaWiki", "Module",
];

/// Canonical form of a wiki title: NFC, underscores as spaces, no fragment,
/// trimmed, single spaces and first-letter caps. A colon padded on both
/// sides is tightened, and the title after a namespace prefix gets its own
/// first capital.
pub fn canonicalize(text: &str) -> String {
    let normalized = text.nfc().collect::<String>().replace('_', " ");
    let without_fragment = match normalized.find('#') {
        Some(i) => &normalized[..i],
        None => normalized.as_str(),
    };
    let collapsed = SPACES.replace_all(without_fragment.trim(), " ");
    let capitalized = capitalize(&collapsed);
    let mut title = COLON.replacen(&capitalized, 1, ":").into_owned();
    if let Some((prefix, rest)) = title.split_once(':') {
        if is_namespace(prefix) {
            title = format!("{prefix}:{}", capitalize(rest.trim()));
        }
    }
    title.replace('\u{200E}', "")
}

fn is_namespace(prefix: &str) -> bool { NAMESPACES.iter().any(|ns| ns.eq_ignore_ascii_case(prefix)) }

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
