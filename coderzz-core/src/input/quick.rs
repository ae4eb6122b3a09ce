use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// One-click language starters that pre-fill the question box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickAction {
    Python,
    #[serde(alias = "js")]
    JavaScript,
    Java,
    #[serde(rename = "cpp", alias = "c++")]
    Cpp,
}

impl QuickAction {
    pub const ALL: [QuickAction; 4] = [
        QuickAction::Python,
        QuickAction::JavaScript,
        QuickAction::Java,
        QuickAction::Cpp,
    ];

    pub fn language(self) -> &'static str {
        match self {
            QuickAction::Python => "Python",
            QuickAction::JavaScript => "JavaScript",
            QuickAction::Java => "Java",
            QuickAction::Cpp => "C++",
        }
    }

    /// Text staged into the input buffer, ready for the user to finish.
    pub fn prefix(self) -> String {
        format!("Generate {} code for: ", self.language())
    }
}

impl fmt::Display for QuickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.language())
    }
}

impl FromStr for QuickAction {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" | "py" => Ok(QuickAction::Python),
            "javascript" | "js" => Ok(QuickAction::JavaScript),
            "java" => Ok(QuickAction::Java),
            "c++" | "cpp" => Ok(QuickAction::Cpp),
            other => Err(PolicyError::InvalidInput(format!(
                "unknown quick action '{other}'; expected python, javascript, java or c++"
            ))),
        }
    }
}
