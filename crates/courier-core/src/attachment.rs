use crate::error::{CourierError, Result};
use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A stored attachment as listed back to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub name: String,
    pub url: String,
}

fn disallowed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\s.-]").expect("static regex"))
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn underscores() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"__+").expect("static regex"))
}

/// Strip characters that break storage paths: keep ASCII letters, digits,
/// underscores, spaces, dots and hyphens; spaces become underscores; runs of
/// underscores collapse.
pub fn sanitize_file_name(name: &str) -> String {
    let kept = disallowed().replace_all(name.trim(), "");
    let spaced = whitespace().replace_all(&kept, "_");
    let collapsed = underscores().replace_all(&spaced, "_");
    let out = collapsed.trim_matches('_').to_string();
    if out.is_empty() || out.chars().all(|c| c == '.') {
        "file".to_string()
    } else {
        out
    }
}

/// `<unix millis>-<4 random chars>-<sanitized name>`.
pub fn unique_file_name<R: Rng + ?Sized>(original: &str, now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..4)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!(
        "{}-{}-{}",
        now.timestamp_millis(),
        suffix,
        sanitize_file_name(original)
    )
}

/// The stored file name is the percent-decoded last path segment of its
/// public URL.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or("");
    let segment = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");
    let decoded = percent_decode_str(segment).decode_utf8().map_err(|_| {
        CourierError::InvalidRequest(format!("file name in '{url}' is not valid UTF-8"))
    })?;
    let name = decoded.trim();
    if name.is_empty()
        || name.contains(['/', '\\'])
        || name.contains("..")
        || without_query.ends_with("//")
    {
        return Err(CourierError::InvalidRequest(format!(
            "could not extract a file name from '{url}'"
        )));
    }
    Ok(name.to_string())
}
