use env_logger::{Builder, Env};

/// Environment variable holding the log filter, e.g. `debug` or
/// `battleship_bus::transport=debug,info`.
pub const LOG_ENV: &str = "BATTLESHIP_LOG";

/// Initialize logging from `BATTLESHIP_LOG`, defaulting to `info`.
/// Safe to call more than once.
pub fn init_logging() {
    let _ = Builder::from_env(Env::default().filter_or(LOG_ENV, "info"))
        .format_timestamp_millis()
        .try_init();
}
