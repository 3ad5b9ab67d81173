//! Logging infrastructure for surveyctl
//!
//! Logs to ~/.surveyctl/logs/ with date-based files and age-based cleanup.
//!
//! Supports a task-scoped context naming the operation and form being synced.
//! Nothing is written until `init` has been called.

use chrono::Local;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);
static TRACE: AtomicBool = AtomicBool::new(false);
static TASK_LOG_CONTEXTS: OnceLock<Mutex<HashMap<String, LogContext>>> = OnceLock::new();

/// Per-task (or per-thread outside tokio) logging context
#[derive(Default, Clone)]
pub struct LogContext {
    pub operation: Option<String>,
    pub form: Option<String>,
}

thread_local! {
    static LOG_CONTEXT: RefCell<LogContext> = RefCell::new(LogContext::default());
}

/// Update just the operation in the current context
pub fn set_operation(operation: &str) {
    if with_task_context_mut(|ctx| {
        ctx.operation = Some(operation.to_string());
    }) {
        return;
    }

    LOG_CONTEXT.with(|c| {
        c.borrow_mut().operation = Some(operation.to_string());
    });
}

/// Update just the form in the current context
pub fn set_form(form: &str) {
    if with_task_context_mut(|ctx| {
        ctx.form = Some(form.to_string());
    }) {
        return;
    }

    LOG_CONTEXT.with(|c| {
        c.borrow_mut().form = Some(form.to_string());
    });
}

/// Clear the logging context for the current task
pub fn clear_context() {
    if let Some(task_id) = current_task_id() {
        if let Some(store) = TASK_LOG_CONTEXTS.get() {
            if let Ok(mut contexts) = store.lock() {
                contexts.remove(&task_id);
            }
        }
    }

    LOG_CONTEXT.with(|c| {
        *c.borrow_mut() = LogContext::default();
    });
}

pub(crate) fn context_prefix() -> String {
    if let Some(task_ctx) = task_context_snapshot() {
        return context_prefix_for(&task_ctx);
    }

    LOG_CONTEXT.with(|c| context_prefix_for(&c.borrow()))
}

fn current_task_id() -> Option<String> {
    tokio::task::try_id().map(|id| id.to_string())
}

fn with_task_context_mut(update: impl FnOnce(&mut LogContext)) -> bool {
    let Some(task_id) = current_task_id() else {
        return false;
    };

    let store = TASK_LOG_CONTEXTS.get_or_init(|| Mutex::new(HashMap::new()));
    if let Ok(mut contexts) = store.lock() {
        let ctx = contexts.entry(task_id).or_default();
        update(ctx);
        true
    } else {
        false
    }
}

fn task_context_snapshot() -> Option<LogContext> {
    let task_id = current_task_id()?;
    let store = TASK_LOG_CONTEXTS.get()?;
    let contexts = store.lock().ok()?;
    contexts.get(&task_id).cloned()
}

fn context_prefix_for(ctx: &LogContext) -> String {
    let mut parts = Vec::new();

    if let Some(ref operation) = ctx.operation {
        parts.push(format!("op:{}", operation));
    }
    if let Some(ref form) = ctx.form {
        // Form names are operator-typed and can be long
        parts.push(format!("form:{}", truncate(form, 24)));
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!("[{}] ", parts.join("|"))
    }
}

pub struct Logger {
    file: File,
    path: PathBuf,
}

impl Logger {
    fn new() -> Option<Self> {
        let path = log_path()?;
        fs::create_dir_all(path.parent()?).ok()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()?;

        Some(Self { file, path })
    }

    fn write(&mut self, level: &str, message: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let ctx = context_prefix();
        let line = format!("[{}] [{}] {}{}\n", timestamp, level, ctx, message);
        let _ = self.file.write_all(line.as_bytes());
        let _ = self.file.flush();
    }
}

/// Initialize the logger (call once at startup)
pub fn init() {
    if let Ok(mut guard) = LOGGER.lock() {
        if guard.is_none() {
            *guard = Logger::new();
        }
    }
}

fn write(level: &str, message: &str) {
    if let Ok(mut guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_mut() {
            logger.write(level, message);
        }
    }
}

/// Log an info message
pub fn info(message: &str) {
    write("INFO", message);
}

/// Log an error message
pub fn error(message: &str) {
    write("ERROR", message);
}

/// Log a warning message
pub fn warn(message: &str) {
    write("WARN", message);
}

/// Enable debug lines regardless of the environment (`--trace`)
pub fn set_trace(enabled: bool) {
    TRACE.store(enabled, Ordering::Relaxed);
}

/// Log a debug message (only with `--trace` or SURVEYCTL_TRACE set)
pub fn debug(message: &str) {
    if TRACE.load(Ordering::Relaxed) || std::env::var("SURVEYCTL_TRACE").is_ok() {
        write("DEBUG", message);
    }
}

/// Path of the log file the logger writes to (or would write to)
pub fn current_path() -> Option<PathBuf> {
    LOGGER
        .lock()
        .ok()
        .and_then(|guard| guard.as_ref().map(|logger| logger.path.clone()))
}

fn log_dir() -> Option<PathBuf> {
    crate::storage::surveyctl_dir().ok().map(|dir| dir.join("logs"))
}

/// Get path to today's log file
pub fn log_path() -> Option<PathBuf> {
    let date = Local::now().format("%Y-%m-%d");
    Some(log_dir()?.join(format!("surveyctl-{}.log", date)))
}

/// Remove log files older than `retain_days`
pub fn cleanup_old_logs(retain_days: u32) {
    let Some(log_dir) = log_dir() else {
        return;
    };
    let Ok(entries) = fs::read_dir(&log_dir) else {
        return;
    };

    let cutoff = Local::now() - chrono::Duration::days(i64::from(retain_days));
    for entry in entries.flatten() {
        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                let modified: chrono::DateTime<Local> = modified.into();
                if modified < cutoff {
                    let _ = fs::remove_file(entry.path());
                }
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}
