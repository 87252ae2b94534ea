//! Logging setup.
//!
//! `debug` in the overlay settings raises the level filter to DEBUG; otherwise only
//! INFO and above are printed. `RUST_LOG` still overrides both.

use lazy_static::lazy_static;
use log::LevelFilter;
use std::sync::atomic::{AtomicBool, Ordering};

lazy_static! {
    static ref DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(false);
}

/// Initialize the logger. Call once at startup, before settings are known.
pub fn init_logging() {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Debug)
        .format_timestamp_millis()
        .format_module_path(false);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    // Already initialized in tests
    let _ = builder.try_init();
    log::set_max_level(LevelFilter::Info);
}

/// Toggle DEBUG output at runtime.
pub fn set_diagnostics_enabled(enabled: bool) {
    DIAGNOSTICS_ENABLED.store(enabled, Ordering::SeqCst);
    log::set_max_level(level_for(enabled));
    log::info!(
        "[DiagnosticLogger] Diagnostics {}",
        if enabled { "ENABLED" } else { "DISABLED" }
    );
}

pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS_ENABLED.load(Ordering::SeqCst)
}

fn level_for(enabled: bool) -> LevelFilter {
    if enabled {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}
