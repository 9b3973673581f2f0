use crate::source::{fetch_text, ByteSource, FetchError};

/// Split the contents of a label file into one label per line.
///
/// Lines are not trimmed and empty lines are kept, so text ending with a
/// newline produces an empty final label.
pub fn parse_labels(text: &str) -> Vec<String> {
    text.split('\n').map(|label| label.to_string()).collect()
}

/// Fetch a newline-delimited label file.
pub fn fetch_labels(source: &dyn ByteSource, url: &str) -> Result<Vec<String>, FetchError> {
    fetch_text(source, url).map(|text| parse_labels(&text))
}
