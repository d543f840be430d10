//! `log` records forwarded to the browser console.

use log::{LevelFilter, Metadata, Record};

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        #[cfg(target_arch = "wasm32")]
        {
            use log::Level;
            use web_sys::console;
            let msg = wasm_bindgen::JsValue::from_str(&format!(
                "[{}] {}",
                record.target(),
                record.args()
            ));
            match record.level() {
                Level::Error => console::error_1(&msg),
                Level::Warn => console::warn_1(&msg),
                Level::Info => console::info_1(&msg),
                Level::Debug | Level::Trace => console::debug_1(&msg),
            }
        }
        #[cfg(not(target_arch = "wasm32"))]
        eprintln!("{:<5} [{}] {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

/// Install the console logger once; later calls only change the level.
pub fn init(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_err() {
        log::trace!("console logger already installed");
    }
    log::set_max_level(level);
}

pub fn parse_level(name: &str) -> LevelFilter {
    name.parse().unwrap_or_else(|_| {
        log::warn!("unknown log level `{name}`, using warn");
        LevelFilter::Warn
    })
}
