use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single input row.
///
/// Every field is optional: a field that fails to parse is carried as `None`
/// and only becomes an error if a later stage requires it (the writer
/// requires `id`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: Option<i64>,
    pub payload: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}
