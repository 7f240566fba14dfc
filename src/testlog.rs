//! Test logger. Prints through `env_logger` like `is_test(true)` does and keeps every record
//! so tests can check which target a message went out under.

use log::{LevelFilter, Log, Metadata, Record};
use std::sync::{Mutex, Once, OnceLock};

struct Recorder {
    inner: env_logger::Logger,
    records: Mutex<Vec<(String, String)>>,
}

impl Log for Recorder {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.target().to_owned(), record.args().to_string()));
        }
        self.inner.log(record);
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

static RECORDER: OnceLock<Recorder> = OnceLock::new();
static INIT: Once = Once::new();

/// Install the logger. Safe to call from every test.
pub(crate) fn init() {
    INIT.call_once(|| {
        let recorder = RECORDER.get_or_init(|| Recorder {
            inner: env_logger::Builder::from_default_env().is_test(true).build(),
            records: Mutex::new(Vec::new()),
        });
        if log::set_logger(recorder).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
}

/// Messages logged so far under `target`. Tests run in parallel, so each one picks its own
/// target.
pub(crate) fn messages(target: &str) -> Vec<String> {
    RECORDER
        .get()
        .and_then(|recorder| recorder.records.lock().ok())
        .map(|records| {
            records
                .iter()
                .filter(|(t, _)| t == target)
                .map(|(_, msg)| msg.clone())
                .collect()
        })
        .unwrap_or_default()
}
