use crate::record::{Extras, LogRecord};
use crate::style::Style;
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;

/// Separator between the base line and the rendered extras.
pub const EXTRAS_SEPARATOR: &str = " # ";

/// `asctime` layout, always UTC.
pub const ASCTIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// How the extras suffix is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtrasFormat {
    /// Compact JSON object, e.g. `{"d":"abc","sth":"ohoho"}`.
    #[default]
    Json,
    /// Space separated `key=value` pairs with JSON values, e.g. `d="abc" sth="ohoho"`.
    /// Keys other than plain identifiers are JSON-quoted as well.
    Pairs,
}

/// Render `extras` deterministically; keys come out in sorted order.
pub fn render_extras(extras: &Extras, format: ExtrasFormat) -> String {
    match format {
        ExtrasFormat::Json => {
            serde_json::to_string(extras).unwrap_or_else(|_| format!("{:?}", extras))
        }
        ExtrasFormat::Pairs => {
            let mut out = String::new();
            for (key, value) in extras {
                if !out.is_empty() {
                    out.push(' ');
                }
                if is_bare_key(key) {
                    out.push_str(key);
                } else {
                    out.push_str(&serde_json::Value::from(key.as_str()).to_string());
                }
                let _ = write!(out, "={}", value);
            }
            out
        }
    }
}

/// Keys that read unambiguously without quotes in `key=value` pairs.
fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Produces the final text line for a record.
///
/// The base line comes from the [`Style`]; a non-empty extras map is
/// appended after [`EXTRAS_SEPARATOR`]. Records without extras are
/// treated as having an empty map.
#[derive(Clone)]
pub struct LineFormatter {
    style: Arc<dyn Style>,
    extras_format: ExtrasFormat,
}

impl LineFormatter {
    pub fn new(style: Arc<dyn Style>) -> Self {
        LineFormatter { style, extras_format: ExtrasFormat::default() }
    }

    pub fn with_extras_format(mut self, format: ExtrasFormat) -> Self {
        self.extras_format = format;
        self
    }

    /// Format `record` into a single line, without a trailing newline.
    pub fn format(&self, record: &LogRecord) -> String {
        let asctime = self
            .style
            .uses_time()
            .then(|| record.timestamp.format(ASCTIME_FORMAT).to_string());

        let mut out = String::with_capacity(128);
        self.style.render(record, asctime.as_deref(), &mut out);

        let extras = record.extras_or_empty();
        if !extras.is_empty() {
            out.push_str(EXTRAS_SEPARATOR);
            out.push_str(&render_extras(extras, self.extras_format));
        }
        out
    }
}
