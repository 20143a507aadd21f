use regex_lite::Regex;
use std::sync::OnceLock;

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect(stringify!($name)))
        }
    };
}

cached_regex!(admin_enabled_re, r"(?i)admin[\s\-]*state\s*[:=]?\s*(enable|enabled|up|active)\b");
cached_regex!(admin_disabled_re, r"(?i)admin[\s\-]*state\s*[:=]?\s*(disable|disabled|down|inactive)\b");
cached_regex!(onu_enabled_re, r"(?i)onu\s*status\s*[:=]?\s*(enable|enabled|up)\b");
cached_regex!(onu_disabled_re, r"(?i)onu\s*status\s*[:=]?\s*(disable|disabled|down)\b");
cached_regex!(no_shutdown_re, r"(?im)^\s*no\s+shutdown\s*$");
cached_regex!(shutdown_re, r"(?im)^\s*shutdown\s*$");
cached_regex!(
    operational_re,
    r"(?i)(operation|operational|state|status)\s*(state|status)?\s*[:=]\s*([a-zA-Z0-9_-]+)"
);
cached_regex!(name_line_re, r"(?im)^\s*name\s+(.+?)\s*$");
cached_regex!(device_error_re, r"(?i)(Invalid|not found|No such)");

/// Whether a per-interface read came back empty or as a CLI error
/// instead of configuration.
pub fn is_error_output(output: &str) -> bool {
    output.trim().is_empty() || device_error_re().is_match(output)
}

/// Whether the interface is administratively enabled. Detail output is
/// consulted first, then the interface's configuration. Defaults to disabled.
pub fn admin_state(detail: &str, config: &str) -> bool {
    if admin_enabled_re().is_match(detail) {
        return true;
    }
    if admin_disabled_re().is_match(detail) {
        return false;
    }
    if onu_enabled_re().is_match(detail) {
        return true;
    }
    if onu_disabled_re().is_match(detail) {
        return false;
    }

    if no_shutdown_re().is_match(config) {
        return true;
    }
    if shutdown_re().is_match(config) {
        return false;
    }

    false
}

/// First operational/state/status token in detail output, lower-cased
pub fn operational_state(detail: &str) -> String {
    operational_re()
        .captures(detail)
        .and_then(|caps| caps.get(3))
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| "unknown".to_string())
}

/// First `name <text>` line of a configuration excerpt
pub fn customer_name(config: &str) -> Option<String> {
    name_line_re()
        .captures(config)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
