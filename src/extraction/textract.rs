//! Amazon Textract implementation of [`TextDetector`].

use aws_sdk_textract::types::{BlockType, Document, S3Object};

use crate::{notification::ObjectLocator, utils::BoxFuture};

use super::TextDetector;

/// Runs synchronous text detection against an object in S3.
///
/// The object is referenced in place; its bytes never pass through the worker.
#[derive(Clone)]
pub struct TextractDetector {
    client: aws_sdk_textract::Client,
}

impl TextractDetector {
    pub fn new(client: aws_sdk_textract::Client) -> Self {
        Self { client }
    }
}

impl TextDetector for TextractDetector {
    fn detect_lines<'a>(
        &'a self,
        locator: &'a ObjectLocator,
    ) -> BoxFuture<'a, eyre::Result<Vec<String>>> {
        Box::pin(async move {
            let document = Document::builder()
                .s3_object(
                    S3Object::builder()
                        .bucket(locator.bucket())
                        .name(locator.key())
                        .build(),
                )
                .build();

            let output = self
                .client
                .detect_document_text()
                .document(document)
                .send()
                .await?;

            let lines = output
                .blocks
                .unwrap_or_default()
                .into_iter()
                .filter(|block| matches!(block.block_type, Some(BlockType::Line)))
                .filter_map(|block| block.text)
                .collect::<Vec<_>>();

            tracing::debug!(%locator, lines = lines.len(), "Detected document text");

            Ok(lines)
        })
    }
}
