//! S3 object notification payloads.

use serde::{Deserialize, Serialize};

use crate::error::{MedallionError, Result};

/// A batch of S3 notification records, as delivered to a function handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records")]
    pub records: Vec<S3EventRecord>,
}

/// One object notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3EventRecord {
    #[serde(rename = "eventName")]
    pub event_name: String,

    #[serde(rename = "eventTime", default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,

    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Object {
    /// URL-encoded object key
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl S3Event {
    /// Decode a notification payload.
    ///
    /// Payloads missing required fields are rejected as a whole.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MedallionError::InvalidNotification(e.to_string()))
    }

    /// Decode an already-parsed payload.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| MedallionError::InvalidNotification(e.to_string()))
    }

    /// Build a batch of creation events for plain keys.
    pub fn object_created<I, S>(bucket: &str, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let records = keys
            .into_iter()
            .map(|key| S3EventRecord {
                event_name: "ObjectCreated:Put".to_string(),
                event_time: None,
                s3: S3Entity {
                    bucket: S3Bucket {
                        name: bucket.to_string(),
                    },
                    object: S3Object {
                        key: key.into(),
                        size: None,
                    },
                },
            })
            .collect();
        Self { records }
    }
}

impl S3EventRecord {
    /// The object key with URL encoding removed.
    pub fn object_key(&self) -> String {
        decode_object_key(&self.s3.object.key)
    }

    pub fn bucket(&self) -> &str {
        &self.s3.bucket.name
    }
}

/// Undo the form encoding S3 applies to keys in notifications.
///
/// Keys that do not decode to UTF-8 are returned with only `+` replaced.
pub fn decode_object_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
