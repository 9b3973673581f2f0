use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Error parsing a comma-separated list such as `1,3,224,224`.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseListError {
    text: String,
    kind: ParseListErrorKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParseListErrorKind {
    /// An item could not be parsed.
    InvalidItem(String),
    /// The list has the wrong number of items.
    WrongLength { expected: usize, actual: usize },
}

impl ParseListError {
    pub fn kind(&self) -> &ParseListErrorKind {
        &self.kind
    }
}

impl Display for ParseListError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ParseListErrorKind::InvalidItem(item) => {
                write!(f, "invalid item \"{}\" in list \"{}\"", item, self.text)
            }
            ParseListErrorKind::WrongLength { expected, actual } => write!(
                f,
                "expected {} items in list \"{}\" but found {}",
                expected, self.text, actual
            ),
        }
    }
}

impl Error for ParseListError {}

/// Parse a comma-separated list of values.
pub fn parse_list<T: FromStr>(text: &str) -> Result<Vec<T>, ParseListError> {
    text.split(',')
        .map(str::trim)
        .map(|item| {
            item.parse().map_err(|_| ParseListError {
                text: text.to_string(),
                kind: ParseListErrorKind::InvalidItem(item.to_string()),
            })
        })
        .collect()
}

/// Parse a comma-separated list with exactly `N` values.
pub fn parse_array<T: FromStr, const N: usize>(text: &str) -> Result<[T; N], ParseListError> {
    let items = parse_list(text)?;
    let actual = items.len();
    items.try_into().map_err(|_| ParseListError {
        text: text.to_string(),
        kind: ParseListErrorKind::WrongLength {
            expected: N,
            actual,
        },
    })
}
