use time::OffsetDateTime;

/// Format a timestamp as YYYY-MM-DD string
pub fn format_date(timestamp: Option<OffsetDateTime>) -> String {
    use time::macros::format_description;

    let format = format_description!("[year]-[month]-[day]");
    timestamp
        .and_then(|dt| dt.format(&format).ok())
        .unwrap_or_else(|| "-".to_string())
}

/// Format a sources list for display
pub fn format_sources(sources: &[String]) -> String {
    if sources.is_empty() {
        "(none)".to_string()
    } else {
        sources.join(",")
    }
}

/// Shorten a string to `width` characters, marking the cut with '~'
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}
