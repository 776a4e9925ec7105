//! Object key construction
//!
//! Sanitizes uploaded file names, joins them with target directories and
//! converts keys to and from their URL form.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

/// Substitute for every character outside the allowlist
pub const REPLACEMENT: &str = "_";

const MAX_FILE_NAME_BYTES: usize = 255;

lazy_static! {
    /// Anything other than ASCII letters, digits, `@`, `.`, `_` and `-`
    static ref DISALLOWED_CHARS: Regex = Regex::new(r"[^A-Za-z0-9@._-]").unwrap();

    /// `.`, `..` and friends
    static ref RELATIVE_NAME: Regex = Regex::new(r"^\.+$").unwrap();

    /// Device names Windows refuses as file names, with or without extension
    static ref WINDOWS_RESERVED_NAME: Regex =
        Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])(\..*)?$").unwrap();

    static ref TRAILING_DOTS: Regex = Regex::new(r"\.+$").unwrap();
}

/// Replace every disallowed character with [`REPLACEMENT`]
///
/// One substitute per character, so `город.zip` becomes `_____.zip`.
pub fn replace_disallowed(raw: &str) -> String {
    DISALLOWED_CHARS.replace_all(raw, REPLACEMENT).into_owned()
}

/// Map a raw file name to a name that is safe both on disk and in a URL
///
/// The mapping is lossy: distinct inputs may produce the same output, so
/// callers storing objects still have to check for collisions.
pub fn sanitize_file_name(raw: &str) -> String {
    let mut name = replace_disallowed(raw);

    if RELATIVE_NAME.is_match(&name) || WINDOWS_RESERVED_NAME.is_match(&name) {
        name = REPLACEMENT.to_string();
    }

    let mut name = TRAILING_DOTS.replace(&name, REPLACEMENT).into_owned();
    // only ASCII is left, any byte index is a char boundary
    name.truncate(MAX_FILE_NAME_BYTES);
    name
}

/// Compose `stem[-attempt]ext` within the file name cap
///
/// The stem is shortened first so the numeric suffix and the extension
/// survive, and trailing dots of the result are replaced.
pub fn numbered_file_name(stem: &str, attempt: u32, ext: &str) -> String {
    let suffix = match attempt {
        0 => String::new(),
        n => format!("-{}", n),
    };
    // leave room for at least one stem byte
    let ext = truncate_at_boundary(ext, MAX_FILE_NAME_BYTES - suffix.len() - 1);
    let stem = truncate_at_boundary(stem, MAX_FILE_NAME_BYTES - suffix.len() - ext.len());

    let name = format!("{}{}{}", stem, suffix, ext);
    TRAILING_DOTS.replace(&name, REPLACEMENT).into_owned()
}

fn truncate_at_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Split a file name into stem and extension (with its leading dot)
///
/// Dot files such as `.env` have no extension.
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}

/// Join a directory and a file name into a relative object key
///
/// Empty and `.` segments are dropped and `..` removes the previous segment,
/// so keys never start with `/` and never climb above the bucket root.
pub fn join_key(dir: &str, file_name: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in dir.split('/').chain(file_name.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Split a relative key back into directory and file name
pub fn split_key(key: &str) -> (&str, &str) {
    key.rsplit_once('/').unwrap_or(("", key))
}

/// Date partitioned directory `base/YYYY/MM`
pub fn target_dir_at(base_dir: Option<&str>, now: DateTime<Utc>) -> String {
    let partition = now.format("%Y/%m").to_string();
    join_key(base_dir.unwrap_or(""), &partition)
}

pub fn target_dir(base_dir: Option<&str>) -> String {
    target_dir_at(base_dir, Utc::now())
}

/// Percent-encode a whole key, slashes included
pub fn encode_key(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

pub fn decode_key(encoded: &str) -> Option<String> {
    urlencoding::decode(encoded).ok().map(|k| k.into_owned())
}
