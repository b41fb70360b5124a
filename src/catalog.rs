use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use once_cell::sync::Lazy;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::model::ModelChoice;
use crate::surface::DocumentSurface;

static BUILTIN_JSON: &str = include_str!("../data/examples.json");

static BUILTIN: Lazy<ExampleCatalog> =
    Lazy::new(|| ExampleCatalog::from_json(BUILTIN_JSON).expect("valid bundled example catalog"));

/// Languages the bundled examples are written in.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize)]
pub enum Language {
    #[serde(rename = "pt")]
    Portuguese,
    #[serde(rename = "es")]
    Spanish,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Portuguese, Language::Spanish];

    pub fn tag(self) -> &'static str {
        match self {
            Language::Portuguese => "pt",
            Language::Spanish => "es",
        }
    }

    /// Model option selected when an example in this language is shown.
    pub fn model(self) -> ModelChoice {
        match self {
            Language::Portuguese => ModelChoice::Portuguese,
            Language::Spanish => ModelChoice::Spanish,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|language| language.tag().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| CatalogError::UnknownLanguage(value.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog state: no examples for language {0}")]
    InvalidState(Language),
    #[error("unknown language tag {0:?}")]
    UnknownLanguage(String),
    #[error("failed to parse example catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read example catalog: {0}")]
    Io(#[from] std::io::Error),
}

/// One sample document together with the language it is written in.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Example<'a> {
    pub language: Language,
    pub text: &'a str,
}

/// Fixed sample documents per language. Never mutated after construction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ExampleCatalog {
    entries: BTreeMap<Language, Vec<String>>,
}

impl ExampleCatalog {
    /// The catalog compiled into the crate.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Language, Vec<S>)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(language, texts)| (language, texts.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    pub fn examples(&self, language: Language) -> &[String] {
        self.entries
            .get(&language)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Uniformly picks one example of the given language.
    pub fn pick_example<R>(&self, language: Language, rng: &mut R) -> Result<Example<'_>, CatalogError>
    where
        R: Rng + ?Sized,
    {
        let text = self
            .examples(language)
            .choose(rng)
            .ok_or(CatalogError::InvalidState(language))?;
        Ok(Example { language, text })
    }

    /// Flips a fair coin between Portuguese and Spanish, then picks uniformly
    /// within that language.
    pub fn pick_random_example<R>(&self, rng: &mut R) -> Result<Example<'_>, CatalogError>
    where
        R: Rng + ?Sized,
    {
        let language = if rng.gen_bool(0.5) {
            Language::Portuguese
        } else {
            Language::Spanish
        };
        self.pick_example(language, rng)
    }
}

/// Fills the form with a random example and selects the matching model.
pub fn show_random_example<'c, S, R>(
    surface: &mut S,
    catalog: &'c ExampleCatalog,
    rng: &mut R,
) -> Result<Example<'c>, CatalogError>
where
    S: DocumentSurface + ?Sized,
    R: Rng + ?Sized,
{
    let example = catalog.pick_random_example(rng)?;
    debug!(language = %example.language, "showing random example");
    surface.select_model(example.language.model().index());
    surface.set_document_text(example.text);
    Ok(example)
}
