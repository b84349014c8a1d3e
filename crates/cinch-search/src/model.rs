//! What the search policy needs to know about the model it serves.

/// Model metadata consulted when resolving a fractional deferral threshold.
pub trait ModelInfo: Send + Sync {
    /// Maximum input tokens the model accepts, if known.
    fn max_input_tokens(&self) -> Option<usize>;
}

/// A model with a known context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow(pub usize);

impl ModelInfo for ContextWindow {
    fn max_input_tokens(&self) -> Option<usize> {
        Some(self.0)
    }
}

/// A model that does not report its context window. Fractional thresholds
/// fall back to [`DEFAULT_CONTEXT_WINDOW`](crate::tools::budget::DEFAULT_CONTEXT_WINDOW).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnknownModel;

impl ModelInfo for UnknownModel {
    fn max_input_tokens(&self) -> Option<usize> {
        None
    }
}
