// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Unit identifier is empty or invalid.
    InvalidUnitId(String),
    /// Unit number is out of range.
    InvalidUnitNumber(u32),
    /// Novedad code is empty or invalid.
    InvalidNovedadCode(String),
    /// Order address is empty.
    InvalidAddress(String),
    /// Order identifier is empty or invalid.
    InvalidOrderId(String),
    /// Failed to parse a calendar date string.
    DateParseError {
        /// The invalid date string.
        date_string: String,
        /// The parsing error message.
        error: String,
    },
    /// The configured timezone is not a valid IANA name.
    InvalidTimezone(String),
    /// Date arithmetic overflow.
    DateArithmeticOverflow {
        /// Description of the operation that failed.
        operation: String,
    },
    /// A legacy archived order could not be normalized.
    UnreadableArchivedOrder {
        /// Why the record could not be mapped to the canonical schema.
        reason: String,
    },
    /// The novedad configuration lists the same code twice.
    DuplicateNovedadCode(String),
    /// The novedad code is not present (or not enabled) in the configuration.
    NovedadCodeNotConfigured(String),
    /// A snapshot for the date already exists and merge was not requested.
    AlreadyArchived(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUnitId(msg) => write!(f, "Invalid unit id: {msg}"),
            Self::InvalidUnitNumber(number) => {
                write!(f, "Invalid unit number: {number}. Must be greater than 0")
            }
            Self::InvalidNovedadCode(msg) => write!(f, "Invalid novedad code: {msg}"),
            Self::InvalidAddress(msg) => write!(f, "Invalid address: {msg}"),
            Self::InvalidOrderId(msg) => write!(f, "Invalid order id: {msg}"),
            Self::DateParseError { date_string, error } => {
                write!(f, "Failed to parse date '{date_string}': {error}")
            }
            Self::InvalidTimezone(tz) => write!(f, "Invalid timezone: '{tz}'"),
            Self::DateArithmeticOverflow { operation } => {
                write!(f, "Date arithmetic overflow while {operation}")
            }
            Self::UnreadableArchivedOrder { reason } => {
                write!(f, "Archived order could not be read: {reason}")
            }
            Self::DuplicateNovedadCode(code) => {
                write!(f, "Novedad code '{code}' is configured more than once")
            }
            Self::NovedadCodeNotConfigured(code) => {
                write!(f, "Novedad code '{code}' is not configured or not enabled")
            }
            Self::AlreadyArchived(date) => {
                write!(f, "An archive snapshot for {date} already exists")
            }
        }
    }
}

impl std::error::Error for DomainError {}
