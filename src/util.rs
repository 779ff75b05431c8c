use chrono::{DateTime, Utc};

pub const MAX_HANDLE_LEN: usize = 15;
pub const MAX_BIO_LEN: usize = 500;

/// Strips the first `@` from a handle, the way people tend to paste them.
pub fn clean_handle(raw: &str) -> String {
    raw.trim().replacen('@', "", 1)
}

pub fn is_valid_handle(handle: &str) -> bool {
    !handle.is_empty()
        && handle.chars().count() <= MAX_HANDLE_LEN
        && handle
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

pub fn initial(handle: &str) -> String {
    handle
        .chars()
        .next()
        .map(|ch| ch.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_owned())
}

pub fn format_join_date(joined_at: DateTime<Utc>) -> String {
    joined_at.format("%B %-d, %Y").to_string()
}

pub fn profile_link(handle: &str) -> String {
    format!("https://twitter.com/{handle}")
}
