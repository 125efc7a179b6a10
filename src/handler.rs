use crate::filter::RecordFilter;
use crate::format::LineFormatter;
use crate::record::LogRecord;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Destination for [`LogRecord`]s produced by the layer.
///
/// Handlers are called synchronously on the thread that emitted the
/// event. They must not fail the caller: any error is dealt with locally.
pub trait Handler: Send + Sync {
    fn handle(&self, record: &LogRecord);
}

/// Writes one formatted line per record to a [`MakeWriter`].
///
/// Every record is run through the handler's own filters (on a private
/// copy, so other handlers see the record untouched), formatted, and
/// written with a single `write_all` while holding the handler lock.
/// Lines from concurrent callers therefore never interleave.
pub struct StreamHandler<W> {
    writer: W,
    formatter: LineFormatter,
    filters: Vec<Box<dyn RecordFilter>>,
    lock: Mutex<()>,
    /// Lines that could not be written.
    pub failed_writes: Arc<AtomicU64>,
}

impl<W> StreamHandler<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    pub fn new(writer: W, formatter: LineFormatter) -> Self {
        StreamHandler {
            writer,
            formatter,
            filters: Vec::new(),
            lock: Mutex::new(()),
            failed_writes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_filter(mut self, filter: impl RecordFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Filter and format `record`; `None` if a filter rejected it.
    pub fn format(&self, record: &LogRecord) -> Option<String> {
        let mut record = record.clone();
        for filter in &self.filters {
            if !filter.filter(&mut record) {
                return None;
            }
        }
        Some(self.formatter.format(&record))
    }
}

impl<W> Handler for StreamHandler<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fn handle(&self, record: &LogRecord) {
        let Some(mut line) = self.format(record) else {
            return;
        };
        line.push('\n');

        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut writer = self.writer.make_writer();
        let result = writer.write_all(line.as_bytes()).and_then(|_| writer.flush());
        if let Err(e) = result {
            self.failed_writes.fetch_add(1, Ordering::Relaxed);
            eprintln!("log handler write failed: {}", e);
        }
    }
}

/// A handler that simply drops all records.
#[derive(Clone, Default)]
pub struct NullHandler;

impl Handler for NullHandler {
    fn handle(&self, _record: &LogRecord) {}
}
