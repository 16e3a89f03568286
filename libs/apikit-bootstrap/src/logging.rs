use crate::config::{LoggingConfig, Section};
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

// Non-blocking console worker must outlive the subscriber.
static CONSOLE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// `target` equals `prefix` or lives below it (`prefix::...`).
fn matches_target_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

// ================= rotating file sinks =================

type SharedRotate = Arc<Mutex<FileRotate<AppendTimestamp>>>;

#[derive(Clone)]
struct RotWriter(SharedRotate);

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log file lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log file lock poisoned"))?
            .flush()
    }
}

/// Writer that silently drops output when no file is routed for a target.
struct RoutedWriter(Option<RotWriter>);

impl Write for RoutedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Routes records to per-prefix files, falling back to the default file.
/// The longest matching prefix wins, so `apikit::http` beats `apikit`.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<RotWriter>,
    by_prefix: Vec<(String, RotWriter)>,
}

impl FileRouter {
    fn route(&self, target: &str) -> Option<RotWriter> {
        self.by_prefix
            .iter()
            .filter(|(prefix, _)| matches_target_prefix(target, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = RoutedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriter(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        RoutedWriter(self.route(meta.target()))
    }
}

fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating_writer(
    section: &Section,
    base_dir: &Path,
) -> std::io::Result<(PathBuf, RotWriter)> {
    let log_path = resolve_log_path(section.file.trim(), base_dir);
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // MaxFiles wins over Age when both are configured.
    let limit = match section.max_backups {
        Some(n) => FileLimit::MaxFiles(n),
        None => FileLimit::Age(chrono::Duration::days(
            i64::from(section.max_age_days.unwrap_or(1)),
        )),
    };
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) as usize * 1024 * 1024;

    let rot = FileRotate::new(
        &log_path,
        AppendTimestamp::default(limit),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        None,
    );
    Ok((log_path, RotWriter(Arc::new(Mutex::new(rot)))))
}

fn section_writer(label: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }
    match open_rotating_writer(section, base_dir) {
        Ok((_, writer)) => Some(writer),
        Err(e) => {
            // No subscriber yet; stderr is the only channel.
            eprintln!("Failed to open log file for '{label}' ({}): {e}", section.file);
            None
        }
    }
}

fn build_file_router(cfg: &LoggingConfig, base_dir: &Path) -> FileRouter {
    let mut router = FileRouter::default();
    for (name, section) in cfg {
        let Some(writer) = section_writer(name, section, base_dir) else {
            continue;
        };
        if name == DEFAULT_SECTION {
            router.default = Some(writer);
        } else {
            router.by_prefix.push((name.clone(), writer));
        }
    }
    router
}

// ================= per-sink targets =================

#[derive(Clone, Copy)]
enum Sink {
    Console,
    File { has_default_file: bool },
}

fn level_of(section: &Section, sink: Sink) -> LevelFilter {
    let raw = match sink {
        Sink::Console => section.console_level.as_str(),
        Sink::File { .. } => section.file_level.as_str(),
    };
    parse_tracing_level(raw).map_or(LevelFilter::OFF, LevelFilter::from_level)
}

fn build_targets(cfg: &LoggingConfig, sink: Sink) -> Targets {
    let fallback = match sink {
        Sink::Console => LevelFilter::INFO,
        Sink::File { has_default_file: true } => LevelFilter::INFO,
        Sink::File { has_default_file: false } => LevelFilter::OFF,
    };
    let default_level = cfg
        .get(DEFAULT_SECTION)
        .filter(|s| match sink {
            Sink::Console => !s.console_level.trim().is_empty(),
            Sink::File { has_default_file } => has_default_file && !s.file_level.trim().is_empty(),
        })
        .map_or(fallback, |s| level_of(s, sink));

    let mut targets = Targets::new().with_default(default_level);
    for (prefix, section) in cfg.iter().filter(|(k, _)| k.as_str() != DEFAULT_SECTION) {
        // A file rule only matters when that prefix has its own file.
        if matches!(sink, Sink::File { .. }) && section.file.trim().is_empty() {
            continue;
        }
        targets = targets.with_target(prefix.clone(), level_of(section, sink));
    }
    targets
}

// ================= public init =================

/// Install the global subscriber: console (stderr, human readable) plus
/// optional JSON files routed by target prefix. `RUST_LOG`, when set, caps both.
pub fn init_logging(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` before the subscriber goes in.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("LogTracer init skipped: {e}");
    }

    if cfg.is_empty() {
        init_minimal();
        return;
    }

    let router = build_file_router(cfg, base_dir);
    let console_targets = build_targets(cfg, Sink::Console);
    let file_targets = build_targets(
        cfg,
        Sink::File {
            has_default_file: router.default.is_some(),
        },
    );

    let env = EnvFilter::try_from_default_env().ok();

    let (nb_stderr, guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = CONSOLE_GUARD.set(guard);

    let console_layer = fmt::layer()
        .with_writer(nb_stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_targets);

    let file_layer = (!router.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(router)
            .with_filter(file_targets)
    });

    let _ = Registry::default()
        .with(env)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// INFO to stderr; honors `RUST_LOG`.
pub fn init_minimal() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let _ = Registry::default().with(env).with(fmt_layer).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn section(console: &str, file: &str, file_level: &str) -> Section {
        Section {
            console_level: console.into(),
            file: file.into(),
            file_level: file_level.into(),
            max_age_days: None,
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn prefix_matching_respects_path_segments() {
        assert!(matches_target_prefix("apikit", "apikit"));
        assert!(matches_target_prefix("apikit::http", "apikit"));
        assert!(!matches_target_prefix("apikit_bootstrap", "apikit"));
        assert!(!matches_target_prefix("api", "apikit"));
    }

    #[test]
    fn unknown_levels_fall_back_to_info() {
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("loud"), Some(Level::INFO));
    }

    #[test]
    fn console_targets_apply_per_prefix_levels() {
        let mut cfg: LoggingConfig = HashMap::new();
        cfg.insert("default".into(), section("warn", "", ""));
        cfg.insert("apikit::http".into(), section("debug", "", ""));
        cfg.insert("hyper".into(), section("off", "", ""));

        let targets = build_targets(&cfg, Sink::Console);
        assert!(targets.would_enable("apikit::http", &Level::DEBUG));
        assert!(!targets.would_enable("apikit::scanner", &Level::INFO));
        assert!(targets.would_enable("apikit::scanner", &Level::WARN));
        assert!(!targets.would_enable("hyper::client", &Level::ERROR));
    }

    #[test]
    fn file_targets_are_off_without_a_default_file() {
        let mut cfg: LoggingConfig = HashMap::new();
        cfg.insert("default".into(), section("info", "", "debug"));
        cfg.insert("apikit::http".into(), section("info", "http.log", "trace"));

        let targets = build_targets(&cfg, Sink::File { has_default_file: false });
        assert!(!targets.would_enable("apikit::scanner", &Level::ERROR));
        assert!(targets.would_enable("apikit::http", &Level::TRACE));
    }

    #[test]
    fn router_prefers_longest_prefix_then_default() {
        let dir = tempdir().unwrap();
        let mut cfg: LoggingConfig = HashMap::new();
        cfg.insert("default".into(), section("info", "all.log", "info"));
        cfg.insert("apikit".into(), section("info", "apikit.log", "info"));
        cfg.insert("apikit::http".into(), section("info", "nested/http.log", "info"));

        let router = build_file_router(&cfg, dir.path());
        assert!(!router.is_empty());
        assert!(dir.path().join("nested").is_dir());

        let http = router.route("apikit::http").unwrap();
        let expected = &router
            .by_prefix
            .iter()
            .find(|(p, _)| p == "apikit::http")
            .unwrap()
            .1;
        assert!(Arc::ptr_eq(&http.0, &expected.0));

        let other = router.route("reqwest::connect").unwrap();
        assert!(Arc::ptr_eq(&other.0, &router.default.as_ref().unwrap().0));
    }

    #[test]
    fn routed_writer_without_file_swallows_output() {
        let mut writer = RoutedWriter(None);
        assert_eq!(writer.write(b"dropped").unwrap(), 7);
        writer.flush().unwrap();
    }
}
