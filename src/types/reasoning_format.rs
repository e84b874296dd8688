use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a reasoning model exposes its chain of thought.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningFormat {
    /// Reasoning is not returned at all.
    #[default]
    Hidden,

    /// Reasoning is returned inline, wrapped in `<think>` tags.
    Raw,

    /// Reasoning is returned in a separate `reasoning` field.
    Parsed,
}

impl fmt::Display for ReasoningFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasoningFormat::Hidden => write!(f, "hidden"),
            ReasoningFormat::Raw => write!(f, "raw"),
            ReasoningFormat::Parsed => write!(f, "parsed"),
        }
    }
}

impl FromStr for ReasoningFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hidden" | "off" => Ok(ReasoningFormat::Hidden),
            "raw" => Ok(ReasoningFormat::Raw),
            "parsed" | "visible" | "on" => Ok(ReasoningFormat::Parsed),
            _ => Err(format!(
                "Invalid reasoning format: {s}. Valid options: hidden, raw, parsed"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_hidden() {
        assert_eq!(ReasoningFormat::default(), ReasoningFormat::Hidden);
    }

    #[test]
    fn parse() {
        assert_eq!("RAW".parse::<ReasoningFormat>(), Ok(ReasoningFormat::Raw));
        assert_eq!(
            "visible".parse::<ReasoningFormat>(),
            Ok(ReasoningFormat::Parsed)
        );
        assert!("loud".parse::<ReasoningFormat>().is_err());
    }

    #[test]
    fn serialization() {
        assert_eq!(
            serde_json::to_string(&ReasoningFormat::Parsed).unwrap(),
            r#""parsed""#
        );
    }
}
