use std::time::Duration;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse a duration given in whole seconds, or return the given default value otherwise.
pub fn parse_seconds(value: Option<String>, default: Duration) -> Duration {
    value.and_then(|v| v.trim().parse::<u64>().ok()).map(Duration::from_secs).unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("yes".into()), false));
        assert!(parse_boolean_flag(Some(" TRUE ".into()), false));
        assert!(!parse_boolean_flag(Some("off".into()), true));
        assert!(parse_boolean_flag(None, true));
        assert!(parse_boolean_flag(Some("bananas".into()), true));
    }

    #[test]
    fn seconds() {
        assert_eq!(parse_seconds(Some("15".into()), Duration::from_secs(2)), Duration::from_secs(15));
        assert_eq!(parse_seconds(Some("nope".into()), Duration::from_secs(2)), Duration::from_secs(2));
        assert_eq!(parse_seconds(None, Duration::from_secs(2)), Duration::from_secs(2));
    }
}
