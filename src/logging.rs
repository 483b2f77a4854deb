use std::{
    fmt,
    fs::OpenOptions,
    io::Write,
    sync::{Mutex, OnceLock},
};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

const LOG_PATH: &str = "logs.txt";

static LOG_FILE: OnceLock<Mutex<Option<std::fs::File>>> = OnceLock::new();
static LOGGER: FileLogger = FileLogger;

fn with_log_file(mut f: impl FnMut(&mut std::fs::File)) {
    let mutex = LOG_FILE.get_or_init(|| Mutex::new(None));
    let Ok(mut guard) = mutex.lock() else {
        return;
    };

    if guard.is_none() {
        *guard = OpenOptions::new()
            .create(true)
            .append(true)
            .open(LOG_PATH)
            .ok();
    }

    if let Some(file) = guard.as_mut() {
        f(file);
    }
}

fn log_fmt(args: fmt::Arguments) {
    with_log_file(|file| {
        let _ = file.write_fmt(args);
        let _ = file.write_all(b"\n");
        let _ = file.flush();
    });
}

/// Appends every record to `logs.txt` in the current working directory.
pub struct FileLogger;

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        log_fmt(format_args!(
            "[{:<5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {
        with_log_file(|file| {
            let _ = file.flush();
        });
    }
}

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
