//! DynamoDB implementation of [`ResultStore`].

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;

use crate::utils::BoxFuture;

use super::{JobRecord, ResultStore};

/// Writes job records to a DynamoDB table whose partition key is `jobId`.
///
/// `PutItem` replaces the whole item, which makes every write an upsert.
#[derive(Clone)]
pub struct DynamoResultStore {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoResultStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

impl ResultStore for DynamoResultStore {
    fn put<'a>(&'a self, record: &'a JobRecord) -> BoxFuture<'a, eyre::Result<()>> {
        Box::pin(async move {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(to_item(record)))
                .send()
                .await?;

            tracing::debug!(
                table = %self.table_name,
                job_id = %record.job_id,
                "Stored job record"
            );

            Ok(())
        })
    }
}

fn to_item(record: &JobRecord) -> HashMap<String, AttributeValue> {
    let s = |value: &str| AttributeValue::S(value.to_owned());

    HashMap::from([
        ("jobId".to_owned(), s(&record.job_id)),
        ("timestamp".to_owned(), s(&record.timestamp_string())),
        ("status".to_owned(), s(record.status.as_ref())),
        ("s3Bucket".to_owned(), s(record.locator.bucket())),
        ("s3Key".to_owned(), s(record.locator.key())),
        ("sentiment".to_owned(), s(record.sentiment.as_ref())),
        (
            "sentimentScorePositive".to_owned(),
            AttributeValue::N(record.sentiment_score_positive.to_string()),
        ),
        ("extractedText".to_owned(), s(&record.extracted_text)),
    ])
}
