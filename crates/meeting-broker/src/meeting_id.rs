//! Meeting ID generation and validation.
//!
//! A meeting ID is a human-shareable room code of the form `XXXX-XXXX-XXXX`:
//! three groups of four ASCII alphanumeric characters. Generated IDs are
//! uppercase and built from the last 8 digits of the current epoch
//! milliseconds followed by random base-36 characters.
//!
//! IDs are not credentials and carry no uniqueness guarantee. Nothing
//! records issued IDs, so a syntactically valid ID is all a join needs.

use crate::errors::BrokerError;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of characters in each group.
const GROUP_LENGTH: usize = 4;

/// Number of groups.
const GROUP_COUNT: usize = 3;

/// Alphanumeric characters in an ID (separators excluded).
const ID_CHAR_COUNT: usize = GROUP_LENGTH * GROUP_COUNT;

/// Trailing timestamp digits kept in a generated ID.
const TIMESTAMP_DIGITS: usize = 8;

/// Random characters appended after the timestamp digits.
const RANDOM_CHARS: usize = 6;

/// Group separator.
const SEPARATOR: char = '-';

/// Validated meeting identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MeetingId(String);

impl MeetingId {
    /// Generate a fresh meeting ID from the current time.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now(), &mut rand::thread_rng())
    }

    /// Generate a meeting ID for a given instant and random source.
    pub fn generate_at<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Self {
        let millis = now.timestamp_millis().unsigned_abs().to_string();
        let timestamp_suffix = millis
            .get(millis.len().saturating_sub(TIMESTAMP_DIGITS)..)
            .unwrap_or(&millis);

        let random_suffix: String = (0..RANDOM_CHARS)
            .map(|_| {
                let digit = rng.gen_range(0..36u32);
                char::from_digit(digit, 36)
                    .unwrap_or('0')
                    .to_ascii_uppercase()
            })
            .collect();

        let mut chars: Vec<char> = timestamp_suffix
            .chars()
            .chain(random_suffix.chars())
            .take(ID_CHAR_COUNT)
            .collect();
        chars.resize(ID_CHAR_COUNT, '0');

        let id = chars
            .chunks(GROUP_LENGTH)
            .map(|group| group.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string());

        Self(id)
    }

    /// Check whether `candidate` has the canonical `XXXX-XXXX-XXXX` shape.
    ///
    /// Letters of either case are accepted.
    pub fn validate(candidate: &str) -> bool {
        let groups: Vec<&str> = candidate.split(SEPARATOR).collect();

        groups.len() == GROUP_COUNT
            && groups.iter().all(|group| {
                group.len() == GROUP_LENGTH && group.bytes().all(|b| b.is_ascii_alphanumeric())
            })
    }

    /// Parse a caller-supplied meeting ID, keeping its original spelling.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::Validation` if the format is wrong.
    pub fn parse(candidate: &str) -> Result<Self, BrokerError> {
        if Self::validate(candidate) {
            Ok(Self(candidate.to_string()))
        } else {
            Err(BrokerError::Validation(
                "Invalid meeting ID format".to_string(),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MeetingId {
    type Error = BrokerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MeetingId> for String {
    fn from(id: MeetingId) -> Self {
        id.0
    }
}
