use crate::config::{LoggingConfig, Section};
use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use parking_lot::Mutex;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

// -------- level helpers --------

/// Unknown values fall back to INFO; "off"/"none" disable the sink.
fn parse_level(s: &str) -> LevelFilter {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

fn named_sections(cfg: &LoggingConfig) -> Vec<(&str, &Section)> {
    let mut named: Vec<_> = cfg
        .iter()
        .filter(|(name, _)| name.as_str() != DEFAULT_SECTION)
        .map(|(name, section)| (name.as_str(), section))
        .collect();
    named.sort_by_key(|(name, _)| *name);
    named
}

/// Console: named subsystems at their own level, everything else at the
/// default section's level (OFF without a default section).
fn console_targets(cfg: &LoggingConfig) -> Targets {
    let default_level = cfg
        .get(DEFAULT_SECTION)
        .map(|s| parse_level(&s.console_level))
        .unwrap_or(LevelFilter::OFF);

    named_sections(cfg)
        .into_iter()
        .fold(Targets::new().with_default(default_level), |t, (name, s)| {
            t.with_target(name, parse_level(&s.console_level))
        })
}

/// Default file sink: everything except the subsystems that have a section.
fn default_file_targets(cfg: &LoggingConfig, level: LevelFilter) -> Targets {
    named_sections(cfg)
        .into_iter()
        .fold(Targets::new().with_default(level), |t, (name, _)| {
            t.with_target(name, LevelFilter::OFF)
        })
}

// -------- rotating file sink --------

#[derive(Clone)]
struct RotatingWriter(Arc<Mutex<FileRotate<AppendCount>>>);

struct RotatingHandle(Arc<Mutex<FileRotate<AppendCount>>>);

impl<'a> fmt::MakeWriter<'a> for RotatingWriter {
    type Writer = RotatingHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingHandle(self.0.clone())
    }
}

impl Write for RotatingHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().flush()
    }
}

/// Absolute paths are kept; relative ones are joined with `base_dir` (home_dir).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating(log_path: &Path, section: &Section) -> std::io::Result<RotatingWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);

    let rot = FileRotate::new(
        log_path,
        AppendCount::new(backups),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(RotatingWriter(Arc::new(Mutex::new(rot))))
}

/// `None` when the section has no file or the file cannot be opened
/// (reported on stderr: the subscriber is not installed yet).
fn section_writer(subsystem: &str, section: &Section, base_dir: &Path) -> Option<RotatingWriter> {
    if section.file.trim().is_empty() {
        return None;
    }
    let log_path = resolve_log_path(&section.file, base_dir);
    match open_rotating(&log_path, section) {
        Ok(writer) => Some(writer),
        Err(e) => {
            eprintln!(
                "failed to open log file for '{}': {} ({})",
                subsystem,
                log_path.display(),
                e
            );
            None
        }
    }
}

fn json_file_layer(writer: RotatingWriter, filter: Targets) -> BoxedLayer {
    fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(writer)
        .with_filter(filter)
        .boxed()
}

fn build_layers(cfg: &LoggingConfig, base_dir: &Path) -> Vec<BoxedLayer> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    layers.push(
        fmt::layer()
            .with_ansi(std::io::stdout().is_terminal())
            .with_target(true)
            .with_level(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_filter(console_targets(cfg))
            .boxed(),
    );

    for (name, section) in named_sections(cfg) {
        if let Some(writer) = section_writer(name, section, base_dir) {
            let filter = Targets::new().with_target(name, parse_level(&section.file_level));
            layers.push(json_file_layer(writer, filter));
        }
    }

    if let Some(section) = cfg.get(DEFAULT_SECTION) {
        if let Some(writer) = section_writer(DEFAULT_SECTION, section, base_dir) {
            let filter = default_file_targets(cfg, parse_level(&section.file_level));
            layers.push(json_file_layer(writer, filter));
        }
    }

    layers
}

// -------- public init --------

/// Install the global subscriber.
/// - `cfg`: subsystem → section map (see [`LoggingConfig`])
/// - `base_dir`: resolves relative log file paths (usually `server.home_dir`)
///
/// Calling it twice is harmless: the second install is ignored.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(build_layers(cfg, base_dir))
        .try_init();
}

fn init_default_logging() {
    let _ = fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}
