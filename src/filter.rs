use crate::record::{Extras, LogRecord};

/// Key injected by the default [`ContextFilter`].
pub const DEFAULT_CONTEXT_KEY: &str = "sth";

/// Value injected by the default [`ContextFilter`].
pub const DEFAULT_CONTEXT_VALUE: &str = "ohoho";

/// Per-handler hook run on every record right before it is formatted.
///
/// Returning `false` drops the record for that handler only.
pub trait RecordFilter: Send + Sync {
    fn filter(&self, record: &mut LogRecord) -> bool;
}

/// Injects a fixed set of key/values into every record's extras.
///
/// Existing keys with the same name are overwritten. Records without an
/// extras map get one. The filter never rejects a record.
#[derive(Debug, Clone)]
pub struct ContextFilter {
    context: Extras,
}

impl ContextFilter {
    pub fn new(context: Extras) -> Self {
        ContextFilter { context }
    }

    /// Add (or replace) one injected key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn context(&self) -> &Extras {
        &self.context
    }
}

/// Context filter injecting [`DEFAULT_CONTEXT_KEY`] = [`DEFAULT_CONTEXT_VALUE`].
impl Default for ContextFilter {
    fn default() -> Self {
        ContextFilter::new(Extras::new()).with(DEFAULT_CONTEXT_KEY, DEFAULT_CONTEXT_VALUE)
    }
}

impl RecordFilter for ContextFilter {
    fn filter(&self, record: &mut LogRecord) -> bool {
        let extras = record.extras_mut();
        for (key, value) in &self.context {
            extras.insert(key.clone(), value.clone());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::{make_record, RecordParts};
    use serde_json::json;
    use tracing::Level;

    fn record(extra: Option<&Extras>) -> LogRecord {
        let parts = RecordParts {
            level: Level::DEBUG,
            target: "app".to_string(),
            module_path: None,
            pathname: Some("src/main.rs".to_string()),
            function: Some("main".to_string()),
            line: Some(1),
            message: "hello".to_string(),
        };
        make_record(parts, extra)
    }

    #[test]
    fn injects_default_key_and_keeps_prior_entries() {
        let mut extra = Extras::new();
        extra.insert("d".to_string(), json!("abc"));
        let mut record = record(Some(&extra));

        assert!(ContextFilter::default().filter(&mut record));

        let extras = record.extras.unwrap();
        assert_eq!(extras["d"], json!("abc"));
        assert_eq!(extras[DEFAULT_CONTEXT_KEY], json!(DEFAULT_CONTEXT_VALUE));
        assert_eq!(extras.len(), 2);
    }

    #[test]
    fn overwrites_existing_key() {
        let mut extra = Extras::new();
        extra.insert("sth".to_string(), json!(1));
        let mut record = record(Some(&extra));

        ContextFilter::default().filter(&mut record);
        assert_eq!(record.extras_or_empty()["sth"], json!("ohoho"));
    }

    #[test]
    fn tolerates_records_without_extras() {
        let mut record = record(None);
        record.extras = None;

        let filter = ContextFilter::new(Extras::new()).with("region", "eu-west").with("shard", 4);
        assert!(filter.filter(&mut record));

        let extras = record.extras.unwrap();
        assert_eq!(extras["region"], json!("eu-west"));
        assert_eq!(extras["shard"], json!(4));
    }
}
