use std::env;

/// Environment variable which enables verbose output, as if `--verbose`
/// were passed.
pub const VERBOSE_VAR: &str = "NNPREP_VERBOSE";

/// Parse the value of a flag variable.
///
/// Matching is case-insensitive and ignores surrounding whitespace. An empty
/// value counts as unset.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Return whether verbose output is enabled by [`VERBOSE_VAR`].
///
/// Unrecognized values disable verbose output, with a warning.
pub fn verbose_from_env() -> bool {
    let Ok(value) = env::var(VERBOSE_VAR) else {
        return false;
    };
    parse_flag(&value).unwrap_or_else(|| {
        eprintln!(
            "Ignoring {}=\"{}\". Expected one of 1, true, yes, on, 0, false, no, off.",
            VERBOSE_VAR, value
        );
        false
    })
}
