// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fmt;

/// Error taxonomy for relation loading and dependency-metric computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AfdError {
    /// Caller-supplied input cannot be used: empty datasets, empty or
    /// out-of-range index sets, malformed ingress rows.
    Configuration(String),
    /// An internal invariant does not hold.
    Logic(String),
    /// A metric formula would leave its numeric domain.
    NumericDomain(String),
}

impl AfdError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn logic(msg: impl Into<String>) -> Self {
        Self::Logic(msg.into())
    }

    pub fn numeric_domain(msg: impl Into<String>) -> Self {
        Self::NumericDomain(msg.into())
    }
}

impl fmt::Display for AfdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::Logic(msg) => write!(f, "logic error: {msg}"),
            Self::NumericDomain(msg) => write!(f, "numeric domain error: {msg}"),
        }
    }
}

impl std::error::Error for AfdError {}

#[cfg(test)]
mod tests {
    use super::AfdError;

    #[test]
    fn constructor_helpers_build_matching_variants() {
        assert_eq!(
            AfdError::configuration("bad index"),
            AfdError::Configuration("bad index".to_string())
        );
        assert_eq!(
            AfdError::logic("inconsistent table"),
            AfdError::Logic("inconsistent table".to_string())
        );
        assert_eq!(
            AfdError::numeric_domain("division by zero"),
            AfdError::NumericDomain("division by zero".to_string())
        );
    }

    #[test]
    fn display_prefixes_messages_with_error_kind() {
        assert_eq!(
            AfdError::configuration("empty index set").to_string(),
            "configuration error: empty index set"
        );
        assert_eq!(
            AfdError::logic("probing table out of sync").to_string(),
            "logic error: probing table out of sync"
        );
        assert_eq!(
            AfdError::numeric_domain("entropy denominator is zero").to_string(),
            "numeric domain error: entropy denominator is zero"
        );
    }
}
