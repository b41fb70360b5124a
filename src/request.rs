//! The form body sent to `api/clusters`.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use thiserror::Error;

use crate::model::ModelChoice;

/// Bytes left unescaped, matching `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub const DOCUMENT_KEY: &str = "document";
pub const MODEL_KEY: &str = "model";
pub const AUTOMATIC_KEY: &str = "automaticMentionDetection";

pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SubmissionRequest {
    pub document: String,
    /// Zero-based index into the model selector.
    pub model: usize,
    pub automatic_mention_detection: bool,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum FormError {
    #[error("form body is missing the {0:?} field")]
    MissingField(&'static str),
    #[error("model index {0:?} is not a non-negative integer")]
    InvalidModel(String),
    #[error("automaticMentionDetection {0:?} is neither \"true\" nor \"false\"")]
    InvalidFlag(String),
    #[error("form component is not valid UTF-8 once decoded")]
    InvalidUtf8,
}

impl SubmissionRequest {
    pub fn new(document: impl Into<String>, model: usize, automatic_mention_detection: bool) -> Self {
        Self {
            document: document.into(),
            model,
            automatic_mention_detection,
        }
    }

    /// The selected model, if the index names one this client knows about.
    pub fn model_choice(&self) -> Option<ModelChoice> {
        ModelChoice::from_index(self.model)
    }

    pub fn encode_form(&self) -> String {
        let model = self.model.to_string();
        let flag = if self.automatic_mention_detection {
            "true"
        } else {
            "false"
        };
        [
            (DOCUMENT_KEY, self.document.as_str()),
            (MODEL_KEY, model.as_str()),
            (AUTOMATIC_KEY, flag),
        ]
        .iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
    }

    /// Parses a body produced by [`SubmissionRequest::encode_form`] or by a
    /// browser form. Unknown keys are ignored; the last duplicate wins.
    pub fn decode_form(body: &str) -> Result<Self, FormError> {
        let mut document = None;
        let mut model = None;
        let mut flag = None;
        for pair in body.split('&').filter(|pair| !pair.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(raw_key)?;
            let value = decode_component(raw_value)?;
            match key.as_str() {
                DOCUMENT_KEY => document = Some(value),
                MODEL_KEY => model = Some(value),
                AUTOMATIC_KEY => flag = Some(value),
                _ => {}
            }
        }

        let document = document.ok_or(FormError::MissingField(DOCUMENT_KEY))?;
        let model = model.ok_or(FormError::MissingField(MODEL_KEY))?;
        let model = model
            .parse::<usize>()
            .map_err(|_| FormError::InvalidModel(model.clone()))?;
        let flag = flag.ok_or(FormError::MissingField(AUTOMATIC_KEY))?;
        let automatic_mention_detection = match flag.as_str() {
            "true" => true,
            "false" => false,
            _ => return Err(FormError::InvalidFlag(flag)),
        };
        Ok(Self {
            document,
            model,
            automatic_mention_detection,
        })
    }
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

fn decode_component(value: &str) -> Result<String, FormError> {
    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| FormError::InvalidUtf8)
}
