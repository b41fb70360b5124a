//! Client side of the coreference-resolution demo.
//!
//! The resolution model runs on a remote server. This crate picks example
//! documents, shapes the form-encoded request, validates the JSON reply and
//! renders mentions and clusters as plain text for whatever surface hosts
//! the form (the CLI, the bundled web page, or a test double).

pub mod annotation;
pub mod catalog;
pub mod client;
pub mod model;
pub mod request;
pub mod response;
pub mod surface;

#[cfg(feature = "web")]
pub mod web;

pub use annotation::{AnnotatedMention, AnnotationError, ManualMarkup, manual_mentions};
pub use catalog::{CatalogError, Example, ExampleCatalog, Language, show_random_example};
pub use client::{
    ClientConfig, ClusterTransport, HttpTransport, RawResponse, StatusPolicy, SubmissionController,
    SubmitError, SubmitOutcome, TransportError,
};
pub use model::{ModelChoice, ModelParseError};
pub use request::{FormError, SubmissionRequest};
pub use response::{
    ClusterPayload, RenderedOutput, Resolution, ResolutionSummary, ResponseError, render_clusters,
    render_mentions,
};
pub use surface::{DocumentSurface, MemorySurface};
