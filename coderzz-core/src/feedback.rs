//! User feedback on a generated answer

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Acknowledgement shown after helpful feedback.
pub const THANK_YOU: &str = "Thank you for your feedback!";

/// Follow-up question shown after not-helpful feedback.
pub const ASK_CODE_TYPE: &str = "What type of code do you need?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Helpful,
    NotHelpful,
}

impl Feedback {
    /// Parse a feedback label. Matching ignores case and surrounding
    /// whitespace. An empty label, `skip` or `none` means no feedback.
    pub fn parse(label: &str) -> Result<Option<Self>, PolicyError> {
        let normalized = label.trim().to_lowercase();
        match normalized.as_str() {
            "" | "skip" | "none" => Ok(None),
            "yes" | "y" | "helpful" | "👍" => Ok(Some(Feedback::Helpful)),
            "no" | "n" | "not helpful" | "not-helpful" | "unhelpful" | "👎" => {
                Ok(Some(Feedback::NotHelpful))
            }
            _ => Err(PolicyError::InvalidInput(format!(
                "unrecognized feedback '{}'; expected Yes or No",
                label.trim()
            ))),
        }
    }

    pub fn reward(self) -> f64 {
        match self {
            Feedback::Helpful => 1.0,
            Feedback::NotHelpful => -1.0,
        }
    }

    /// Message to show the user once this feedback is recorded.
    pub fn acknowledgement(self) -> &'static str {
        match self {
            Feedback::Helpful => THANK_YOU,
            Feedback::NotHelpful => ASK_CODE_TYPE,
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::Helpful => write!(f, "Yes"),
            Feedback::NotHelpful => write!(f, "No"),
        }
    }
}

impl FromStr for Feedback {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feedback::parse(s)?
            .ok_or_else(|| PolicyError::InvalidInput("feedback is empty".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        for label in ["Yes", "yes", "YES", " y ", "Helpful", "👍"] {
            assert_eq!(Feedback::parse(label).unwrap(), Some(Feedback::Helpful));
        }
        for label in ["No", "no", "N", "Not Helpful", "not-helpful", "unhelpful"] {
            assert_eq!(Feedback::parse(label).unwrap(), Some(Feedback::NotHelpful));
        }
    }

    #[test]
    fn parse_treats_blank_and_skip_as_none() {
        for label in ["", "   ", "skip", "None"] {
            assert_eq!(Feedback::parse(label).unwrap(), None);
        }
    }

    #[test]
    fn parse_rejects_unknown_labels() {
        assert!(matches!(
            Feedback::parse("maybe"),
            Err(PolicyError::InvalidInput(_))
        ));
    }

    #[test]
    fn rewards_are_unit_signed() {
        assert_eq!(Feedback::Helpful.reward(), 1.0);
        assert_eq!(Feedback::NotHelpful.reward(), -1.0);
    }

    #[test]
    fn helpful_feedback_thanks_the_user() {
        let feedback: Feedback = "yes".parse().unwrap();
        assert_eq!(feedback.acknowledgement(), "Thank you for your feedback!");
        assert!("".parse::<Feedback>().is_err());
    }

    #[test]
    fn display_matches_presented_options() {
        assert_eq!(Feedback::Helpful.to_string(), "Yes");
        assert_eq!(Feedback::NotHelpful.to_string(), "No");
    }
}
