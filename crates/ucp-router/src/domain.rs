//! Keyword classifier over the domain vocabulary named in §4.2.

const DOMAINS: &[(&str, &[&str])] = &[
    ("code", &["code", "repo", "commit", "pull request", "function", "compile", "bug", "branch"]),
    ("files", &["file", "directory", "folder", "disk", "path", "upload", "download"]),
    ("email", &["email", "inbox", "mail", "message", "reply", "compose"]),
    ("calendar", &["calendar", "event", "meeting", "schedule", "appointment", "reminder"]),
    ("messaging", &["chat", "slack", "discord", "channel", "dm", "notify"]),
    ("web", &["http", "url", "website", "browser", "fetch", "scrape"]),
    ("database", &["sql", "database", "query", "table", "row", "schema"]),
    ("finance", &["invoice", "payment", "transaction", "budget", "expense", "currency"]),
];

/// Highest-scoring domain label for the query, if any keyword matched.
pub fn classify(query: &str) -> Option<&'static str> {
    let lower = query.to_lowercase();
    DOMAINS
        .iter()
        .map(|(label, keywords)| {
            let hits = keywords.iter().filter(|kw| lower.contains(*kw)).count();
            (*label, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .max_by_key(|(_, hits)| *hits)
        .map(|(label, _)| label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_calendar_query() {
        assert_eq!(classify("schedule a meeting for tomorrow"), Some("calendar"));
    }

    #[test]
    fn unmatched_query_returns_none() {
        assert_eq!(classify("xyzzy plugh"), None);
    }
}
