use super::Transformer;
use crate::error::TransformError;
use chrono::{SecondsFormat, Utc};
use model::records::record::Record;
use serde_json::{Value, json};

/// Wraps each payload in a JSON envelope marking it as processed:
///
/// ```json
/// {"original": <payload>, "processed": true, "timestamp": "2024-03-01T10:15:30.123Z"}
/// ```
///
/// A payload that is itself JSON is embedded as a value, anything else as a
/// string, and a missing payload as `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadEnricher;

impl PayloadEnricher {
    pub fn envelope(payload: Option<&str>) -> Result<String, TransformError> {
        let original = match payload {
            Some(raw) => serde_json::from_str::<Value>(raw)
                .unwrap_or_else(|_| Value::String(raw.to_owned())),
            None => Value::Null,
        };

        let document = json!({
            "original": original,
            "processed": true,
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        Ok(serde_json::to_string(&document)?)
    }
}

impl Transformer for PayloadEnricher {
    fn transform(&self, record: Option<&Record>) -> Result<Option<Record>, TransformError> {
        let Some(record) = record else {
            return Ok(None);
        };

        Ok(Some(Record {
            id: record.id,
            payload: Some(Self::envelope(record.payload.as_deref())?),
            created_at: record.created_at,
        }))
    }

    fn name(&self) -> &'static str {
        "payload-enricher"
    }
}
