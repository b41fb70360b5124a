//! The controls the demo form exposes, abstracted away from any renderer.

/// Read/write access to the document form and its two output areas.
///
/// Output setters replace the previous content wholesale; nothing appends.
pub trait DocumentSurface {
    fn document_text(&self) -> String;
    fn set_document_text(&mut self, text: &str);

    /// Zero-based index of the selected model option.
    fn selected_model(&self) -> usize;
    fn select_model(&mut self, index: usize);

    fn automatic_mention_detection(&self) -> bool;

    fn set_mentions_output(&mut self, text: &str);
    fn set_clusters_output(&mut self, text: &str);
}

/// Plain in-memory form state.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MemorySurface {
    pub document: String,
    pub model: usize,
    pub automatic_mention_detection: bool,
    pub mentions_output: String,
    pub clusters_output: String,
}

impl MemorySurface {
    pub fn new(document: impl Into<String>, model: usize, automatic: bool) -> Self {
        Self {
            document: document.into(),
            model,
            automatic_mention_detection: automatic,
            ..Self::default()
        }
    }
}

impl DocumentSurface for MemorySurface {
    fn document_text(&self) -> String {
        self.document.clone()
    }

    fn set_document_text(&mut self, text: &str) {
        self.document = text.to_string();
    }

    fn selected_model(&self) -> usize {
        self.model
    }

    fn select_model(&mut self, index: usize) {
        self.model = index;
    }

    fn automatic_mention_detection(&self) -> bool {
        self.automatic_mention_detection
    }

    fn set_mentions_output(&mut self, text: &str) {
        self.mentions_output = text.to_string();
    }

    fn set_clusters_output(&mut self, text: &str) {
        self.clusters_output = text.to_string();
    }
}
