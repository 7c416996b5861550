use serde::{Deserialize, Serialize};
use std::fmt;

/// A vehicle registration number, normalized to uppercase alphanumerics.
///
/// The empty value is the "unset" sentinel; there is no deletion, only
/// overwriting with a new value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationNumber(String);

impl RegistrationNumber {
    /// Normalizes free user input: every non-alphanumeric character is dropped
    /// and the rest is uppercased, so `"bg 123-ab"` becomes `"BG123AB"`.
    pub fn new(raw: &str) -> Self {
        Self(
            raw.chars()
                .filter(|c| is_letter_or_digit(*c))
                .flat_map(char::to_uppercase)
                .collect(),
        )
    }

    /// Wraps a value read back from storage without re-normalizing it.
    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Letters and decimal digits only. Letter-like numerals (`Ⅻ`) and other
/// numeric symbols (`²`, `½`) are not part of a registration.
fn is_letter_or_digit(c: char) -> bool {
    c.is_ascii_digit() || (c.is_alphabetic() && !c.is_numeric())
}

impl fmt::Display for RegistrationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegistrationNumber {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
