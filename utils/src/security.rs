//! Sanitization and redaction helpers.
//!
//! These functions keep secrets (signing keys, demo passwords) and untrusted
//! upstream text from leaking verbatim into logs and error messages.

/// Placeholder written in place of a secret.
pub const REDACTED: &str = "[REDACTED]";

/// Upper bound on upstream text echoed into logs or error bodies.
pub const MAX_UPSTREAM_TEXT_CHARS: usize = 512;

/// `Debug`-friendly rendering of an optional secret.
#[must_use]
pub fn mask(secret: Option<&str>) -> &'static str {
    if secret.is_some() { REDACTED } else { "None" }
}

/// Replace every occurrence of each non-empty secret in `text`.
#[must_use]
pub fn redact_secrets(text: &str, secrets: &[&str]) -> String {
    let mut out = text.to_string();
    let mut ordered: Vec<&str> = secrets.iter().copied().filter(|s| !s.is_empty()).collect();
    // Longer secrets first so a secret that contains another is fully replaced.
    ordered.sort_by_key(|s| std::cmp::Reverse(s.len()));
    for secret in ordered {
        if out.contains(secret) {
            out = out.replace(secret, REDACTED);
        }
    }
    out
}

/// Make untrusted upstream text safe to log.
///
/// Control characters other than newline and tab are dropped, and the
/// result is capped at `max_chars` characters with a trailing ellipsis.
#[must_use]
pub fn sanitize_upstream_text(text: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(text.len().min(max_chars * 4));
    let mut count = 0;
    for ch in text.chars() {
        if ch.is_control() && ch != '\n' && ch != '\t' {
            continue;
        }
        if count == max_chars {
            out.push('…');
            return out;
        }
        out.push(ch);
        count += 1;
    }
    out
}
