//! Text extraction.
//!
//! [`TextDetector`] is the raw capability: given an [`ObjectLocator`] it
//! returns the recognized lines in service order. [`ExtractionClient`] turns
//! those lines into the bounded text that is scored and stored.

use std::sync::Arc;

use itertools::Itertools;

use crate::{error::Error, notification::ObjectLocator, utils::BoxFuture};

pub mod textract;

/// Upper bound on stored text, in characters.
pub const MAX_TEXT_CHARS: usize = 4500;

/// Stand-in text when a document yields no lines.
pub const NO_TEXT_PLACEHOLDER: &str = "<No text found>";

/// Separator between lines in the stored text. A literal backslash and `n`,
/// so the text stays on one line in the result item.
pub const LINE_SEPARATOR: &str = "\\n";

/// A text-recognition capability that reads objects directly from storage.
pub trait TextDetector: Send + Sync + 'static {
    /// Detects line-level text in the referenced object.
    ///
    /// Lines are returned in the order the service reports them. An empty
    /// vector means the service found no text.
    fn detect_lines<'a>(
        &'a self,
        locator: &'a ObjectLocator,
    ) -> BoxFuture<'a, eyre::Result<Vec<String>>>;
}

/// Text pulled out of a document, already bounded for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    text: String,
    line_count: usize,
    truncated: bool,
}

impl ExtractionResult {
    /// Joins `lines`, truncating to [`MAX_TEXT_CHARS`] and substituting
    /// [`NO_TEXT_PLACEHOLDER`] when nothing is left.
    pub fn from_lines(lines: &[String]) -> Self {
        let joined = lines.iter().join(LINE_SEPARATOR);
        let text = crate::utils::truncate_chars(&joined, MAX_TEXT_CHARS);
        let truncated = text.len() < joined.len();

        let text = if text.is_empty() {
            NO_TEXT_PLACEHOLDER.to_owned()
        } else {
            text.to_owned()
        };

        Self {
            text,
            line_count: lines.len(),
            truncated,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Number of lines the service returned, before truncation.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn is_placeholder(&self) -> bool {
        self.text == NO_TEXT_PLACEHOLDER
    }
}

/// Extraction stage of the pipeline.
#[derive(Clone)]
pub struct ExtractionClient {
    detector: Arc<dyn TextDetector>,
}

impl ExtractionClient {
    pub fn new(detector: impl TextDetector) -> Self {
        Self {
            detector: Arc::new(detector),
        }
    }

    /// Extracts text from the referenced object.
    ///
    /// Capability failures surface as [`Error::Extraction`]; they are never
    /// replaced by the placeholder.
    pub async fn extract(&self, locator: &ObjectLocator) -> Result<ExtractionResult, Error> {
        let lines = self
            .detector
            .detect_lines(locator)
            .await
            .map_err(|source| Error::Extraction {
                locator: locator.clone(),
                source,
            })?;

        Ok(ExtractionResult::from_lines(&lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_joins_lines_in_order() {
        let result = ExtractionResult::from_lines(&lines(&["Quarterly report", "Revenue up 4%"]));

        assert_eq!(result.text(), "Quarterly report\\nRevenue up 4%");
        assert_eq!(result.line_count(), 2);
        assert!(!result.is_truncated());
        assert!(!result.is_placeholder());
    }

    #[test]
    fn test_no_lines_yields_placeholder() {
        let result = ExtractionResult::from_lines(&[]);
        assert_eq!(result.text(), NO_TEXT_PLACEHOLDER);
        assert_eq!(result.line_count(), 0);
        assert!(result.is_placeholder());

        let result = ExtractionResult::from_lines(&lines(&[""]));
        assert_eq!(result.text(), NO_TEXT_PLACEHOLDER);
    }

    #[test]
    fn test_truncates_to_ceiling() {
        let long = "x".repeat(MAX_TEXT_CHARS + 500);
        let result = ExtractionResult::from_lines(&[long]);

        assert_eq!(result.text().chars().count(), MAX_TEXT_CHARS);
        assert!(result.is_truncated());

        let exact = "y".repeat(MAX_TEXT_CHARS);
        let result = ExtractionResult::from_lines(&[exact.clone()]);
        assert_eq!(result.text(), exact);
        assert!(!result.is_truncated());
    }

    #[test]
    fn test_truncation_counts_separators_and_characters() {
        let line = "é".repeat(3000);
        let result = ExtractionResult::from_lines(&[line.clone(), line]);

        assert_eq!(result.text().chars().count(), MAX_TEXT_CHARS);
        assert!(result.text().contains(LINE_SEPARATOR));
    }
}
