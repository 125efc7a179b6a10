use crate::record::{Extras, LogRecord};
use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata};

/// Prefix of the fields `tracing-log` attaches to events bridged from the
/// `log` facade.
const LOG_BRIDGE_PREFIX: &str = "log.";

/// Function name reported for events emitted outside of any span.
pub const MODULE_LEVEL_FUNCTION: &str = "<module>";

/// Everything a record needs apart from its extras.
#[derive(Debug, Clone)]
pub struct RecordParts {
    pub level: Level,
    pub target: String,
    pub module_path: Option<String>,
    pub pathname: Option<String>,
    pub function: Option<String>,
    pub line: Option<u32>,
    pub message: String,
}

impl RecordParts {
    /// Parts describing the call site of `meta`.
    pub fn from_metadata(meta: &Metadata<'_>, function: Option<&str>, message: String) -> Self {
        RecordParts {
            level: *meta.level(),
            target: meta.target().to_string(),
            module_path: meta.module_path().map(|s| s.to_string()),
            pathname: meta.file().map(|s| s.to_string()),
            function: function.map(|s| s.to_string()),
            line: meta.line(),
            message,
        }
    }
}

/// Build a record whose extras are a copy of `extra`.
///
/// The caller keeps sole ownership of its map: filters that later mutate
/// the record's extras never reach back into it. With no map supplied
/// the record gets an empty one.
pub fn make_record(parts: RecordParts, extra: Option<&Extras>) -> LogRecord {
    let extras = extra.cloned().unwrap_or_default();

    LogRecord {
        timestamp: Utc::now(),
        level: parts.level.to_string(),
        target: parts.target,
        module_path: parts.module_path,
        pathname: parts.pathname,
        function: parts.function,
        line: parts.line,
        message: parts.message,
        extras: Some(extras),
    }
}

/// Whether `meta` belongs to an event bridged from the `log` facade.
pub fn is_bridged(meta: &Metadata<'_>) -> bool {
    meta.fields().field("log.target").is_some()
}

/// Turn a `tracing` event into a [`LogRecord`].
///
/// `span` is the name of the innermost span the event was recorded in.
/// Native events get their fields as extras. Events bridged from the
/// `log` facade are foreign records: their location comes from the
/// `log.*` fields of the bridge, and they carry no extras map and no
/// function name.
pub fn record_from_event(event: &Event<'_>, span: Option<&str>) -> LogRecord {
    let meta = event.metadata();

    let mut fields = Extras::new();
    let mut message: Option<String> = None;
    let mut location = BridgedLocation::default();
    let mut visitor = ExtrasVisitor {
        fields: &mut fields,
        message: &mut message,
        location: &mut location,
    };
    event.record(&mut visitor);
    let message = message.unwrap_or_default();

    if is_bridged(meta) {
        let mut parts = RecordParts::from_metadata(meta, None, message);
        location.apply(&mut parts);
        let mut record = make_record(parts, None);
        record.extras = None;
        return record;
    }

    let function = span.unwrap_or(MODULE_LEVEL_FUNCTION);
    let parts = RecordParts::from_metadata(meta, Some(function), message);
    make_record(parts, Some(&fields))
}

/// Call site of a `log` record, carried by `tracing-log` as event fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgedLocation {
    pub target: Option<String>,
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl BridgedLocation {
    fn capture(&mut self, name: &str, value: &serde_json::Value) {
        match name {
            "log.target" => self.target = value.as_str().map(|s| s.to_string()),
            "log.module_path" => self.module_path = value.as_str().map(|s| s.to_string()),
            "log.file" => self.file = value.as_str().map(|s| s.to_string()),
            "log.line" => self.line = value.as_u64().and_then(|l| u32::try_from(l).ok()),
            _ => {}
        }
    }

    /// Replace the bridge's static call site with the real one, where known.
    fn apply(self, parts: &mut RecordParts) {
        if let Some(target) = self.target {
            parts.target = target;
        }
        parts.module_path = self.module_path.or(parts.module_path.take());
        parts.pathname = self.file.or(parts.pathname.take());
        parts.line = self.line.or(parts.line);
    }
}

/// Collects event fields into an [`Extras`] map.
///
/// `log.*` bridge fields go to `location` instead. Values without a
/// natural JSON form fall back to their textual representation, so no
/// field value is ever rejected.
pub struct ExtrasVisitor<'a> {
    pub fields: &'a mut Extras,
    pub message: &'a mut Option<String>,
    pub location: &'a mut BridgedLocation,
}

impl<'a> ExtrasVisitor<'a> {
    fn insert(&mut self, field: &Field, value: serde_json::Value) {
        if field.name().starts_with(LOG_BRIDGE_PREFIX) {
            self.location.capture(field.name(), &value);
            return;
        }
        self.fields.insert(field.name().to_string(), value);
    }
}

impl<'a> Visit for ExtrasVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.insert(field, serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_i128(&mut self, field: &Field, value: i128) {
        let value = match i64::try_from(value) {
            Ok(v) => serde_json::Value::from(v),
            Err(_) => serde_json::Value::String(value.to_string()),
        };
        self.insert(field, value);
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        let value = match u64::try_from(value) {
            Ok(v) => serde_json::Value::from(v),
            Err(_) => serde_json::Value::String(value.to_string()),
        };
        self.insert(field, value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // NaN and infinities have no JSON number form.
        let value = serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(value.to_string()));
        self.insert(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, serde_json::Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
