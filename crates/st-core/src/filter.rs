//! Completion filter for task listings.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Which tasks a listing includes, by completion state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CompletedFilter {
    /// Completed and open tasks.
    #[default]
    Both,
    /// Only completed tasks.
    Yes,
    /// Only open tasks.
    No,
}

impl CompletedFilter {
    /// Value of the `show_completed` query parameter.
    pub const fn wire_value(self) -> &'static str {
        match self {
            Self::Both => "yes",
            Self::Yes => "only",
            Self::No => "no",
        }
    }
}

impl fmt::Display for CompletedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Both => "both",
            Self::Yes => "yes",
            Self::No => "no",
        };
        write!(f, "{s}")
    }
}

impl FromStr for CompletedFilter {
    type Err = UnknownCompletedFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "both" => Ok(Self::Both),
            "yes" | "true" => Ok(Self::Yes),
            "no" | "false" => Ok(Self::No),
            _ => Err(UnknownCompletedFilter(s.to_string())),
        }
    }
}

/// Error for a completion filter outside both/yes/no/true/false.
#[derive(Debug, Clone, Error)]
#[error("unknown completed filter: {0} (expected both, yes, no, true or false)")]
pub struct UnknownCompletedFilter(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_wire_values() {
        let cases = [
            ("both", "yes"),
            ("yes", "only"),
            ("true", "only"),
            ("no", "no"),
            ("false", "no"),
        ];
        for (input, wire) in cases {
            let filter: CompletedFilter = input.parse().unwrap();
            assert_eq!(filter.wire_value(), wire, "filter {input}");
        }
    }

    #[test]
    fn parsing_ignores_case() {
        assert_eq!("BOTH".parse::<CompletedFilter>().unwrap(), CompletedFilter::Both);
        assert_eq!("True".parse::<CompletedFilter>().unwrap(), CompletedFilter::Yes);
    }

    #[test]
    fn default_is_both() {
        assert_eq!(CompletedFilter::default(), CompletedFilter::Both);
    }

    #[test]
    fn unknown_value_errors() {
        let err = "maybe".parse::<CompletedFilter>().unwrap_err();
        assert!(err.to_string().starts_with("unknown completed filter: maybe"));
    }
}
