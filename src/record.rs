use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Supplementary key/value data attached to a record.
///
/// Keys are kept ordered so every rendering of the map is deterministic.
pub type Extras = BTreeMap<String, serde_json::Value>;

/// One logging call, normalized for filtering and formatting.
///
/// Records built by [`crate::augment`] always carry `pathname` and
/// `extras`. Records that arrive from elsewhere (events bridged from the
/// `log` facade, hand-built records) may lack either; everything
/// downstream treats a missing value as "not available" rather than an
/// error.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub module_path: Option<String>,
    /// Full source path as reported by the call site.
    pub pathname: Option<String>,
    pub function: Option<String>,
    pub line: Option<u32>,
    pub message: String,
    pub extras: Option<Extras>,
}

impl LogRecord {
    /// Extras of the record, or an empty map when none were attached.
    pub fn extras_or_empty(&self) -> &Extras {
        static EMPTY: Extras = BTreeMap::new();
        self.extras.as_ref().unwrap_or(&EMPTY)
    }

    /// Mutable access to the extras map, creating it if the record has none.
    pub fn extras_mut(&mut self) -> &mut Extras {
        self.extras.get_or_insert_with(Extras::new)
    }

    /// Last segment of `pathname`.
    pub fn filename(&self) -> Option<&str> {
        let path = self.pathname.as_deref()?;
        Path::new(path).file_name().and_then(|name| name.to_str())
    }
}
