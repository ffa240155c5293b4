//! Rolling file logs for the sync core.
//!
//! # Responsibility
//! - Start flexi_logger file output once per process from validated
//!   `LogSettings`.
//! - Keep sync diagnostics metadata-only (`event=... module=... status=...`):
//!   identities are redacted and free-form text is flattened before logging.
//!
//! # Invariants
//! - Starting again with identical settings is a no-op; different settings
//!   are rejected with `LoggingError::AlreadyStarted`.
//! - Nothing here panics.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "sprintnote";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;
/// Upper bound for backend error text embedded in one log line.
pub const MAX_LOGGED_ERROR_CHARS: usize = 240;
const REDACTED_IDENTITY_PREFIX_CHARS: usize = 3;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Case-insensitive; `warning` is accepted as `warn`.
    pub fn parse(value: &str) -> Result<Self, LoggingError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(LoggingError::UnsupportedLevel(value.trim().to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// `debug` for debug builds, `info` for release builds.
    pub fn default_for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Info
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated logger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    pub log_dir: PathBuf,
}

impl LogSettings {
    /// # Errors
    /// - `LoggingError::EmptyLogDir` / `RelativeLogDir` unless `log_dir` is
    ///   an absolute path.
    pub fn new(level: LogLevel, log_dir: impl Into<PathBuf>) -> Result<Self, LoggingError> {
        let log_dir = log_dir.into();
        if log_dir.as_os_str().is_empty() {
            return Err(LoggingError::EmptyLogDir);
        }
        if !log_dir.is_absolute() {
            return Err(LoggingError::RelativeLogDir(log_dir));
        }
        Ok(Self { level, log_dir })
    }

    /// Parses untrusted string input, e.g. from FFI callers.
    pub fn parse(level: &str, log_dir: &str) -> Result<Self, LoggingError> {
        Self::new(LogLevel::parse(level)?, log_dir.trim())
    }
}

#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    EmptyLogDir,
    RelativeLogDir(PathBuf),
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
    AlreadyStarted {
        active: LogSettings,
        requested: LogSettings,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(value) => write!(
                f,
                "unsupported log level `{value}`; expected trace|debug|info|warn|error"
            ),
            Self::EmptyLogDir => write!(f, "log_dir cannot be empty"),
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
            Self::CreateDir { path, source } => write!(
                f,
                "failed to create log directory `{}`: {source}",
                path.display()
            ),
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::AlreadyStarted { active, requested } => write!(
                f,
                "logging already started ({} at `{}`); refusing to switch to {} at `{}`",
                active.level,
                active.log_dir.display(),
                requested.level,
                requested.log_dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FlexiLoggerError> for LoggingError {
    fn from(value: FlexiLoggerError) -> Self {
        Self::Backend(value)
    }
}

/// Parses `level` and `log_dir`, then starts logging.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), LoggingError> {
    start_logging(LogSettings::parse(level, log_dir)?)
}

/// Starts rolling file logs, or confirms the already-active settings match.
pub fn start_logging(settings: LogSettings) -> Result<(), LoggingError> {
    let active = ACTIVE_LOGGER.get_or_try_init(|| open_logger(&settings))?;
    if active.settings != settings {
        return Err(LoggingError::AlreadyStarted {
            active: active.settings.clone(),
            requested: settings,
        });
    }
    Ok(())
}

/// Active settings, or `None` before logging started.
pub fn logging_status() -> Option<LogSettings> {
    ACTIVE_LOGGER.get().map(|active| active.settings.clone())
}

fn open_logger(settings: &LogSettings) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&settings.log_dir).map_err(|source| LoggingError::CreateDir {
        path: settings.log_dir.clone(),
        source,
    })?;

    let handle = Logger::try_with_str(settings.level.as_str())?
        .log_to_file(
            FileSpec::default()
                .directory(settings.log_dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        // [YYYY-MM-DD HH:MM:SS.ffffff TZ] LEVEL [module] file:line: message
        .format_for_files(flexi_logger::detailed_format)
        .start()?;

    install_panic_hook_once();
    info!(
        "event=logging_init module=core status=ok level={} log_dir={} platform={} version={}",
        settings.level,
        settings.log_dir.display(),
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        settings: settings.clone(),
        _handle: handle,
    })
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location,
            sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
        );
        previous_hook(panic_info);
    }));
}

/// Short, non-reversible form of a collaborator identity for log lines.
///
/// Keeps the first few characters and the total length, e.g. `ali***(5)`.
pub fn redact_identity(identity: &str) -> String {
    let total = identity.chars().count();
    let prefix = identity
        .chars()
        .take(REDACTED_IDENTITY_PREFIX_CHARS.min(total.saturating_sub(1)))
        .filter(|c| !c.is_control())
        .collect::<String>();
    format!("{prefix}***({total})")
}

/// Single-line, length-capped form of free text (backend messages, panics).
pub fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

/// `Display` of `err`, sanitized for one log line.
pub fn loggable_error(err: &dyn Display) -> String {
    sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, loggable_error, redact_identity, sanitize_message,
        start_logging, LogLevel, LogSettings, LoggingError, MAX_LOGGED_ERROR_CHARS,
    };
    use std::path::PathBuf;

    #[test]
    fn log_level_parse_is_case_insensitive() {
        assert_eq!(LogLevel::parse("INFO").expect("INFO parses"), LogLevel::Info);
        assert_eq!(
            LogLevel::parse(" warning ").expect("warning parses"),
            LogLevel::Warn
        );
        assert!(matches!(
            LogLevel::parse("verbose"),
            Err(LoggingError::UnsupportedLevel(value)) if value == "verbose"
        ));
    }

    #[test]
    fn settings_require_absolute_directory() {
        assert!(matches!(
            LogSettings::parse("info", "   "),
            Err(LoggingError::EmptyLogDir)
        ));
        let err = LogSettings::parse("info", "logs/dev").expect_err("relative dir");
        assert!(matches!(err, LoggingError::RelativeLogDir(_)));
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn sanitize_message_removes_newlines_and_truncates() {
        let sanitized = sanitize_message("line1\nline2\rline3", 8);
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn loggable_error_is_single_line_and_capped() {
        let long = format!("remote said:\n{}", "x".repeat(MAX_LOGGED_ERROR_CHARS * 2));
        let logged = loggable_error(&long);
        assert!(!logged.contains('\n'));
        assert_eq!(logged.chars().count(), MAX_LOGGED_ERROR_CHARS + 3);
    }

    #[test]
    fn redact_identity_hides_most_of_the_value() {
        assert_eq!(redact_identity("alice"), "ali***(5)");
        assert_eq!(redact_identity("a"), "***(1)");
        assert_eq!(redact_identity(""), "***(0)");
        assert!(!redact_identity("_abcdef0123456789").contains("0123"));
    }

    #[test]
    fn start_is_idempotent_for_same_settings_and_rejects_changes() {
        let log_dir = tempfile::tempdir().expect("temp dir");
        let second_dir = tempfile::tempdir().expect("temp dir");
        let dir_str = log_dir.path().to_str().expect("utf-8 temp dir").to_string();

        init_logging("info", &dir_str).expect("first start succeeds");
        init_logging(" INFO ", &dir_str).expect("same settings are idempotent");

        let level_change = init_logging("debug", &dir_str).expect_err("level change fails");
        assert!(matches!(level_change, LoggingError::AlreadyStarted { .. }));
        assert!(level_change.to_string().contains("refusing to switch"));

        let other = LogSettings::new(LogLevel::Info, second_dir.path()).expect("valid settings");
        assert!(matches!(
            start_logging(other),
            Err(LoggingError::AlreadyStarted { .. })
        ));

        let active = logging_status().expect("logging is active");
        assert_eq!(active.level, LogLevel::Info);
        assert_eq!(active.log_dir, PathBuf::from(&dir_str));
    }
}
