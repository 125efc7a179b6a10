use crate::augment::record_from_event;
use crate::handler::Handler;
use std::sync::{atomic::{AtomicU64, Ordering}, Arc};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns every event at or above its level
/// into a [`LogRecord`](crate::record::LogRecord) and hands it to each of
/// its handlers in turn.
///
/// Everything happens synchronously on the emitting thread; the layer owns
/// no background task.
pub struct ExtrasLayer {
    level: LevelFilter,
    handlers: Vec<Arc<dyn Handler>>,
    /// Events that passed the level threshold.
    pub total_events: Arc<AtomicU64>,
}

impl ExtrasLayer {
    pub fn new(level: LevelFilter) -> Self {
        ExtrasLayer {
            level,
            handlers: Vec::new(),
            total_events: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

impl<S> Layer<S> for ExtrasLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.level >= *metadata.level()
    }

    fn max_level_hint(&self) -> Option<LevelFilter> {
        Some(self.level)
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if self.level < *event.metadata().level() {
            return;
        }
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let span = ctx.event_span(event);
        let record = record_from_event(event, span.as_ref().map(|span| span.name()));

        for handler in &self.handlers {
            handler.handle(&record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ContextFilter;
    use crate::format::LineFormatter;
    use crate::handler::{NullHandler, StreamHandler};
    use crate::style::{PathStyle, Template};
    use crate::test_util::TestWriter;
    use std::path::MAIN_SEPARATOR;
    use tracing_subscriber::layer::SubscriberExt;

    const TEMPLATE: &str = "{level} {shortpath}:{function}:{line} {message}";

    fn layer(level: LevelFilter, writer: &TestWriter) -> ExtrasLayer {
        let style = PathStyle::new(Template::parse(TEMPLATE).unwrap());
        let handler = StreamHandler::new(writer.clone(), LineFormatter::new(Arc::new(style)))
            .with_filter(ContextFilter::default());
        ExtrasLayer::new(level)
            .with_handler(Arc::new(handler))
            .with_handler(Arc::new(NullHandler))
    }

    #[test]
    fn renders_event_with_extras_and_context() {
        let writer = TestWriter::default();
        let subscriber = tracing_subscriber::registry().with(layer(LevelFilter::TRACE, &writer));

        let line = line!() + 3;
        tracing::subscriber::with_default(subscriber, || {
            let _span = tracing::info_span!("main").entered();
            tracing::info!(d = "abc", "Some error");
        });

        let expected = format!(
            "INFO ..{sep}src{sep}layer.rs:main:{line} Some error # {{\"d\":\"abc\",\"sth\":\"ohoho\"}}\n",
            sep = MAIN_SEPARATOR,
            line = line
        );
        assert_eq!(writer.get_output(), expected);
    }

    #[tracing::instrument]
    fn charge(order_id: u64) {
        tracing::warn!("card declined");
    }

    #[test]
    fn function_is_innermost_span_or_module() {
        let writer = TestWriter::default();
        let subscriber = tracing_subscriber::registry().with(layer(LevelFilter::TRACE, &writer));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("service started");
            charge(123);
            let _main = tracing::info_span!("main").entered();
            charge(456);
        });

        let output = writer.get_output();
        let functions: Vec<&str> = output
            .lines()
            .map(|line| line.split(':').nth(1).unwrap_or_default())
            .collect();
        assert_eq!(functions, ["<module>", "charge", "charge"]);
    }

    #[test]
    fn events_below_threshold_are_skipped() {
        let writer = TestWriter::default();
        let extras_layer = layer(LevelFilter::INFO, &writer);
        let total = Arc::clone(&extras_layer.total_events);
        let subscriber = tracing_subscriber::registry().with(extras_layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("hidden");
            tracing::trace!("hidden too");
            tracing::warn!("shown");
        });

        let output = writer.get_output();
        assert_eq!(output.lines().count(), 1);
        assert!(output.starts_with("WARN "));
        assert_eq!(total.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn concurrent_callers_never_interleave_lines() {
        let writer = TestWriter::default();
        let subscriber = tracing_subscriber::registry().with(layer(LevelFilter::TRACE, &writer));
        let dispatch = tracing::Dispatch::new(subscriber);

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let dispatch = dispatch.clone();
                scope.spawn(move || {
                    tracing::dispatcher::with_default(&dispatch, || {
                        for i in 0..50 {
                            tracing::info!(worker, i, "payload {}", "x".repeat(64));
                        }
                    });
                });
            }
        });

        let output = writer.get_output();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 8 * 50);
        for line in lines {
            assert!(line.starts_with("INFO "), "{line}");
            assert!(line.contains(" # {\"i\":"), "{line}");
            assert!(line.ends_with('}'), "{line}");
        }
    }
}
