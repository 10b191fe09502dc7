use crate::error::TransformError;
use model::records::record::Record;

pub mod enrich;

/// Per-record mapping applied between reading and writing.
///
/// Implementations must be safe to call again for the same record: a chunk
/// that is retried is transformed again from its original records. Returning
/// `Ok(None)` filters the record out of the chunk.
pub trait Transformer: Send + Sync {
    fn transform(&self, record: Option<&Record>) -> Result<Option<Record>, TransformError>;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Leaves records untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Transformer for PassThrough {
    fn transform(&self, record: Option<&Record>) -> Result<Option<Record>, TransformError> {
        Ok(record.cloned())
    }

    fn name(&self) -> &'static str {
        "pass-through"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_through_is_identity() {
        let record = Record {
            id: Some(3),
            payload: Some("raw".into()),
            created_at: None,
        };
        assert_eq!(PassThrough.transform(Some(&record)).unwrap(), Some(record));
        assert_eq!(PassThrough.transform(None).unwrap(), None);
    }
}
