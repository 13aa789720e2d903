/// Result of looking for a boot message in decoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Found,
    /// Pattern absent; `preview` is the first line of the text for the failure message.
    Missing { preview: String },
}

impl CheckOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, CheckOutcome::Found)
    }
}

/// Case-sensitive substring search. An empty pattern always matches.
pub fn check(text: &str, pattern: &str) -> CheckOutcome {
    if text.contains(pattern) {
        return CheckOutcome::Found;
    }
    CheckOutcome::Missing {
        preview: first_line(text).to_string(),
    }
}

/// Text up to the first line break (`\n` or `\r`).
pub fn first_line(text: &str) -> &str {
    text.split(|c: char| c == '\n' || c == '\r')
        .next()
        .unwrap_or_default()
}
