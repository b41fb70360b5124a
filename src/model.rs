use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::catalog::Language;

/// Backend model variants, in the order the model selector lists them.
///
/// The server identifies a model purely by its zero-based position in this
/// list, so the discriminants are part of the wire contract.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum ModelChoice {
    #[default]
    Portuguese = 0,
    Spanish = 1,
    PortugueseTransferred = 2,
}

impl ModelChoice {
    pub const ALL: [ModelChoice; 3] = [
        ModelChoice::Portuguese,
        ModelChoice::Spanish,
        ModelChoice::PortugueseTransferred,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Tag the server uses to look up the trained model.
    pub fn tag(self) -> &'static str {
        match self {
            ModelChoice::Portuguese => "pt",
            ModelChoice::Spanish => "es",
            ModelChoice::PortugueseTransferred => "pt-transferred",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelChoice::Portuguese => "Portuguese",
            ModelChoice::Spanish => "Spanish",
            ModelChoice::PortugueseTransferred => "Portuguese (transferred)",
        }
    }

    /// Language hint the server passes to automatic mention detection.
    pub fn detection_language(self) -> Language {
        match self {
            ModelChoice::Spanish => Language::Spanish,
            ModelChoice::Portuguese | ModelChoice::PortugueseTransferred => Language::Portuguese,
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
#[error("unknown model {0:?} (expected pt, es, pt-transferred or an index below 3)")]
pub struct ModelParseError(pub String);

impl FromStr for ModelChoice {
    type Err = ModelParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Ok(index) = trimmed.parse::<usize>() {
            return Self::from_index(index).ok_or_else(|| ModelParseError(value.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|choice| choice.tag().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ModelParseError(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_selector_order() {
        for (position, choice) in ModelChoice::ALL.iter().enumerate() {
            assert_eq!(choice.index(), position);
            assert_eq!(ModelChoice::from_index(position), Some(*choice));
        }
        assert_eq!(ModelChoice::from_index(3), None);
    }

    #[test]
    fn parses_tags_and_indices() {
        assert_eq!("es".parse::<ModelChoice>(), Ok(ModelChoice::Spanish));
        assert_eq!(
            "PT-Transferred".parse::<ModelChoice>(),
            Ok(ModelChoice::PortugueseTransferred)
        );
        assert_eq!("0".parse::<ModelChoice>(), Ok(ModelChoice::Portuguese));
        assert!("7".parse::<ModelChoice>().is_err());
        assert!("fr".parse::<ModelChoice>().is_err());
    }

    #[test]
    fn only_spanish_hints_spanish_detection() {
        assert_eq!(
            ModelChoice::Spanish.detection_language(),
            Language::Spanish
        );
        assert_eq!(
            ModelChoice::PortugueseTransferred.detection_language(),
            Language::Portuguese
        );
    }
}
