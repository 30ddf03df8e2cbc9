//! Decoding of object-created notifications.
//!
//! Queue bodies are storage event envelopes of the shape
//! `{"Records": [{"s3": {"bucket": {"name": ..}, "object": {"key": ..}}}]}`.
//! Only the first record is used. Object keys arrive form-encoded (`+` for
//! space, `%XX` escapes) and are decoded before use.

use std::fmt;

use serde::Deserialize;
use snafu::{ensure, OptionExt, ResultExt};

use crate::error::{
    DecodeError, InvalidJsonSnafu, InvalidKeySnafu, MalformedEscapeSnafu, MissingFieldSnafu,
    NoRecordsSnafu,
};

/// Where a document lives: bucket plus object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocator {
    bucket: String,
    key: String,
}

impl ObjectLocator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope {
    records: Option<Vec<Record>>,
}

#[derive(Deserialize)]
struct Record {
    s3: Option<S3Entity>,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: Option<Named>,
    object: Option<Keyed>,
}

#[derive(Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Deserialize)]
struct Keyed {
    key: Option<String>,
}

/// Decodes a queue message body into the locator of the uploaded object.
pub fn decode(body: &str) -> Result<ObjectLocator, DecodeError> {
    let envelope: Envelope = serde_json::from_str(body).context(InvalidJsonSnafu)?;

    let record = envelope
        .records
        .unwrap_or_default()
        .into_iter()
        .next()
        .context(NoRecordsSnafu)?;

    let s3 = record.s3.context(MissingFieldSnafu { field: "s3" })?;

    let bucket = s3
        .bucket
        .and_then(|b| b.name)
        .filter(|name| !name.is_empty())
        .context(MissingFieldSnafu {
            field: "s3.bucket.name",
        })?;

    let raw_key = s3
        .object
        .and_then(|o| o.key)
        .filter(|key| !key.is_empty())
        .context(MissingFieldSnafu {
            field: "s3.object.key",
        })?;

    let key = decode_key(&raw_key)?;

    Ok(ObjectLocator { bucket, key })
}

fn decode_key(raw: &str) -> Result<String, DecodeError> {
    // `urlencoding` passes bad escapes through; such a key names no object.
    ensure!(escapes_are_well_formed(raw), MalformedEscapeSnafu { key: raw });

    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).context(InvalidKeySnafu { key: raw })?;
    Ok(decoded.into_owned())
}

/// Every `%` must start a two-digit hex escape.
fn escapes_are_well_formed(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b == b'%')
        .all(|(i, _)| {
            bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(bucket: &str, key: &str) -> String {
        serde_json::json!({
            "Records": [{
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": bucket, "arn": format!("arn:aws:s3:::{bucket}") },
                    "object": { "key": key, "size": 1024 }
                }
            }]
        })
        .to_string()
    }

    #[test]
    fn test_decode_plain_key() {
        let locator = decode(&event("docs", "uploads/report.pdf")).unwrap();
        assert_eq!(locator, ObjectLocator::new("docs", "uploads/report.pdf"));
    }

    #[test]
    fn test_decode_encoded_keys() {
        let cases = [
            ("annual+report.pdf", "annual report.pdf"),
            ("q1%20results.pdf", "q1 results.pdf"),
            ("a%2Bb.pdf", "a+b.pdf"),
            ("r%C3%A9sum%C3%A9+final.pdf", "résumé final.pdf"),
            ("dir%2Fnested/file.pdf", "dir/nested/file.pdf"),
        ];

        for (raw, expected) in cases {
            let locator = decode(&event("docs", raw)).unwrap();
            assert_eq!(locator.key(), expected, "decoding {raw}");
            assert_eq!(locator.bucket(), "docs");
        }
    }

    #[test]
    fn test_decode_uses_first_record() {
        let body = serde_json::json!({
            "Records": [
                { "s3": { "bucket": { "name": "first" }, "object": { "key": "one.pdf" } } },
                { "s3": { "bucket": { "name": "second" }, "object": { "key": "two.pdf" } } }
            ]
        })
        .to_string();

        assert_eq!(decode(&body).unwrap(), ObjectLocator::new("first", "one.pdf"));
    }

    #[test]
    fn test_decode_malformed() {
        let cases = [
            "not json at all",
            "",
            "[]",
            "null",
            r#"{"Records": "nope"}"#,
        ];

        for body in cases {
            assert!(
                matches!(decode(body), Err(DecodeError::InvalidJson { .. })),
                "expected invalid JSON for {body:?}"
            );
        }
    }

    #[test]
    fn test_decode_no_records() {
        for body in [r#"{}"#, r#"{"Records": []}"#, r#"{"Records": null}"#] {
            assert!(
                matches!(decode(body), Err(DecodeError::NoRecords)),
                "expected no records for {body:?}"
            );
        }

        // Bucket test events carry no records.
        let test_event = r#"{"Service":"Amazon S3","Event":"s3:TestEvent","Bucket":"docs"}"#;
        assert!(matches!(decode(test_event), Err(DecodeError::NoRecords)));
    }

    #[test]
    fn test_decode_missing_fields() {
        let cases = [
            (r#"{"Records": [{}]}"#, "s3"),
            (
                r#"{"Records": [{"s3": {"object": {"key": "a.pdf"}}}]}"#,
                "s3.bucket.name",
            ),
            (
                r#"{"Records": [{"s3": {"bucket": {"name": ""}, "object": {"key": "a.pdf"}}}]}"#,
                "s3.bucket.name",
            ),
            (
                r#"{"Records": [{"s3": {"bucket": {"name": "docs"}}}]}"#,
                "s3.object.key",
            ),
            (
                r#"{"Records": [{"s3": {"bucket": {"name": "docs"}, "object": {}}}]}"#,
                "s3.object.key",
            ),
        ];

        for (body, expected) in cases {
            match decode(body) {
                Err(DecodeError::MissingField { field }) => assert_eq!(field, expected),
                other => panic!("expected missing {expected} for {body}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_decode_malformed_escapes() {
        for raw in ["bad%ZZ.pdf", "trailing%", "short%4", "bad%ZZ%.pdf", "%%20.pdf"] {
            match decode(&event("docs", raw)) {
                Err(DecodeError::MalformedEscape { key }) => assert_eq!(key, raw),
                other => panic!("expected malformed escape for {raw}, got {other:?}"),
            }
        }

        // A literal percent sign arrives escaped.
        let locator = decode(&event("docs", "100%25+done.pdf")).unwrap();
        assert_eq!(locator.key(), "100% done.pdf");
    }

    #[test]
    fn test_decode_invalid_utf8_key() {
        let result = decode(&event("docs", "bad%FF.pdf"));
        assert!(matches!(result, Err(DecodeError::InvalidKey { .. })));
    }
}
