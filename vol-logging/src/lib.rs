//! Tracing subscriber setup for hosts embedding the volume engine.
//!
//! Everything is driven by environment variables so the same binary can log
//! human-readable output to a terminal or JSON to a rolling file.

use std::{
    collections::HashMap,
    env,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::{field::Visit, span, subscriber::Interest, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::MakeWriter,
    layer::{Context, Layer},
    prelude::*,
    registry, EnvFilter,
};

const DEFAULT_LOG_FILE: &str = "/tmp/vol.log";

/// Where formatted events are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
    Off,
}

impl LogOutput {
    fn parse(value: &str) -> Self {
        match value {
            "console" => LogOutput::Console,
            "file" => LogOutput::File,
            "both" => LogOutput::Both,
            _ => LogOutput::Off,
        }
    }

    fn console(self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

/// A `key:value` span-field filter. A value of `*` matches any value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Parse `LOG_TAGS` syntax, e.g. `workspace_id:ws1,strategy:common`.
pub fn parse_tags(raw: &str) -> Vec<Tag> {
    raw.split(',')
        .filter_map(|s| {
            let mut parts = s.splitn(2, ':');
            let key = parts.next()?.trim().to_string();
            let value = parts.next()?.trim().to_string();
            if key.is_empty() {
                return None;
            }
            Some(Tag { key, value })
        })
        .collect()
}

/// Logging settings read from the environment.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub output: LogOutput,
    pub json: bool,
    pub tags: Vec<Tag>,
    pub file_path: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Console,
            json: false,
            tags: Vec::new(),
            file_path: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl LogSettings {
    /// Reads `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_TAGS` and `LOG_FILE_PATH`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            level: env::var("LOG_LEVEL").unwrap_or(defaults.level),
            output: env::var("LOG_OUTPUT")
                .map(|v| LogOutput::parse(&v))
                .unwrap_or(defaults.output),
            json: env::var("LOG_FORMAT").is_ok_and(|v| v == "json"),
            tags: env::var("LOG_TAGS")
                .map(|v| parse_tags(&v))
                .unwrap_or_default(),
            file_path: env::var("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.file_path),
        }
    }
}

struct Tee<A, B> {
    a: A,
    b: B,
}

impl<A, B> Write for Tee<A, B>
where
    A: Write,
    B: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let res_a = self.a.write(buf);
        let res_b = self.b.write(buf);
        res_a.or(res_b)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()
    }
}

#[derive(Clone)]
struct MakeTee<A, B> {
    make_a: A,
    make_b: B,
}

impl<'a, A, B, W1, W2> MakeWriter<'a> for MakeTee<A, B>
where
    A: MakeWriter<'a, Writer = W1>,
    B: MakeWriter<'a, Writer = W2>,
    W1: Write + 'a,
    W2: Write + 'a,
{
    type Writer = Tee<W1, W2>;
    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            a: self.make_a.make_writer(),
            b: self.make_b.make_writer(),
        }
    }
}

/// Drops events whose enclosing spans do not carry every configured tag.
struct TagFilterLayer {
    filters: Vec<Tag>,
}

impl TagFilterLayer {
    fn matches(&self, fields: &HashMap<String, String>) -> bool {
        self.filters.iter().all(|filter| {
            fields
                .get(&filter.key)
                .is_some_and(|value| filter.value == "*" || value.contains(&filter.value))
        })
    }
}

impl<S> Layer<S> for TagFilterLayer
where
    S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = HashMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        span.extensions_mut().insert(fields);
    }

    // Fields declared empty are filled in later, e.g. the resolved strategy.
    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<HashMap<String, String>>() {
            values.record(&mut FieldVisitor(fields));
        }
    }

    // Tags depend on the current span, so no callsite can be decided once.
    fn register_callsite(&self, _meta: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }

    fn enabled(&self, meta: &Metadata<'_>, ctx: Context<'_, S>) -> bool {
        if self.filters.is_empty() || !meta.is_event() {
            return true;
        }

        // Events outside any span cannot carry tags.
        let Some(scope) = ctx.current_span().id().and_then(|id| ctx.span_scope(id)) else {
            return false;
        };

        let mut all_fields = HashMap::new();
        for span_ref in scope {
            if let Some(fields) = span_ref.extensions().get::<HashMap<String, String>>() {
                for (k, v) in fields {
                    all_fields.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }

        self.matches(&all_fields)
    }
}

struct FieldVisitor<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), format!("{value:?}"));
    }
}

/// Initializes the global tracing subscriber from environment variables.
pub fn init_subscriber() -> Option<WorkerGuard> {
    init_subscriber_with(LogSettings::from_env())
}

/// Initializes the global tracing subscriber from explicit settings.
///
/// Returns the file appender guard when a file writer is active; dropping it
/// flushes and stops the background writer.
pub fn init_subscriber_with(settings: LogSettings) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let tag_filter_layer = TagFilterLayer {
        filters: settings.tags.clone(),
    };
    let subscriber = registry().with(env_filter).with(tag_filter_layer);

    let log_dir = settings
        .file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("/tmp"))
        .to_path_buf();
    let log_filename = settings
        .file_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "vol.log".into());

    let mut guard: Option<WorkerGuard> = None;
    let output = settings.output;

    if output.console() && output.file() {
        let file_appender = tracing_appender::rolling::daily(&log_dir, &log_filename);
        let (non_blocking, worker) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker);

        let tee_writer = MakeTee {
            make_a: std::io::stdout,
            make_b: non_blocking,
        };
        let fmt_layer = tracing_subscriber::fmt::layer().with_writer(tee_writer);
        if settings.json {
            subscriber.with(fmt_layer.json()).init();
        } else {
            subscriber.with(fmt_layer.pretty()).init();
        }
    } else if output.console() {
        let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);
        if settings.json {
            subscriber.with(fmt_layer.json()).init();
        } else {
            subscriber.with(fmt_layer.pretty()).init();
        }
    } else if output.file() {
        let file_appender = tracing_appender::rolling::daily(&log_dir, &log_filename);
        let (non_blocking, worker) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker);

        let fmt_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
        if settings.json {
            subscriber.with(fmt_layer.json()).init();
        } else {
            subscriber.with(fmt_layer.pretty()).init();
        }
    } else {
        subscriber.init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags("workspace_id:ws1, strategy:*,broken,:nokey");
        assert_eq!(
            tags,
            vec![
                Tag {
                    key: "workspace_id".into(),
                    value: "ws1".into()
                },
                Tag {
                    key: "strategy".into(),
                    value: "*".into()
                },
            ]
        );
    }

    #[test]
    fn test_tag_filter_matching() {
        let layer = TagFilterLayer {
            filters: parse_tags("workspace_id:ws1,strategy:*"),
        };
        let mut fields = HashMap::new();
        fields.insert("workspace_id".to_string(), "ws1".to_string());
        assert!(!layer.matches(&fields));

        fields.insert("strategy".to_string(), "common".to_string());
        assert!(layer.matches(&fields));

        fields.insert("workspace_id".to_string(), "ws2".to_string());
        assert!(!layer.matches(&fields));
    }

    struct CountEvents(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for CountEvents {
        fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Events seen under `LOG_TAGS=tags` when the span's strategy is recorded late.
    fn events_passing(tags: &str, strategy: &str) -> usize {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = registry()
            .with(TagFilterLayer {
                filters: parse_tags(tags),
            })
            .with(CountEvents(count.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!(
                "reconcile",
                workspace_id = "ws1",
                strategy = tracing::field::Empty
            );
            span.record("strategy", strategy);
            span.in_scope(|| tracing::info!("reconciled volumes"));
            tracing::info!("outside any span");
        });
        count.load(Ordering::SeqCst)
    }

    #[test]
    fn test_tag_filter_sees_fields_recorded_after_span_opens() {
        assert_eq!(events_passing("strategy:common", "common"), 1);
        assert_eq!(events_passing("strategy:common", "emptyDir"), 0);
        assert_eq!(events_passing("workspace_id:ws1,strategy:emptyDir", "emptyDir"), 1);
        assert_eq!(events_passing("", "common"), 2);
    }

    #[test]
    #[serial]
    fn test_settings_from_env() {
        env::set_var("LOG_LEVEL", "debug");
        env::set_var("LOG_OUTPUT", "both");
        env::set_var("LOG_FORMAT", "json");
        env::set_var("LOG_TAGS", "workspace_id:ws1");
        env::set_var("LOG_FILE_PATH", "/var/log/vol/engine.log");

        let settings = LogSettings::from_env();
        assert_eq!(settings.level, "debug");
        assert_eq!(settings.output, LogOutput::Both);
        assert!(settings.json);
        assert_eq!(settings.tags.len(), 1);
        assert_eq!(settings.file_path, PathBuf::from("/var/log/vol/engine.log"));

        for key in ["LOG_LEVEL", "LOG_OUTPUT", "LOG_FORMAT", "LOG_TAGS", "LOG_FILE_PATH"] {
            env::remove_var(key);
        }

        let settings = LogSettings::from_env();
        assert_eq!(settings.level, "info");
        assert_eq!(settings.output, LogOutput::Console);
        assert!(!settings.json);
        assert!(settings.tags.is_empty());
    }
}
