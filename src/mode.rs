//! language mode selected per request.
//!
//! the engine never interprets the mode: its label is forwarded verbatim in the
//! directive entry and the remote model decides what it means.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageMode {
    #[default]
    #[serde(rename = "Auto")]
    Auto,
    #[serde(rename = "Swahili-only")]
    SwahiliOnly,
    #[serde(rename = "English-only")]
    EnglishOnly,
}

impl LanguageMode {
    /// choices in the order a ui presents them.
    pub const ALL: [LanguageMode; 3] = [Self::Auto, Self::SwahiliOnly, Self::EnglishOnly];

    pub fn label(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::SwahiliOnly => "Swahili-only",
            Self::EnglishOnly => "English-only",
        }
    }
}

impl fmt::Display for LanguageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown language mode '{0}' (expected Auto, Swahili-only or English-only)")]
pub struct ModeParseError(pub String);

impl FromStr for LanguageMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModeParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_from_str() {
        for mode in LanguageMode::ALL {
            assert_eq!(mode.to_string().parse::<LanguageMode>(), Ok(mode));
        }
        assert_eq!("swahili-ONLY".parse(), Ok(LanguageMode::SwahiliOnly));
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = "Klingon-only".parse::<LanguageMode>().unwrap_err();
        assert_eq!(err, ModeParseError("Klingon-only".into()));
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::to_string(&LanguageMode::EnglishOnly).unwrap();
        assert_eq!(json, "\"English-only\"");
        let back: LanguageMode = serde_json::from_str("\"Swahili-only\"").unwrap();
        assert_eq!(back, LanguageMode::SwahiliOnly);
    }
}
