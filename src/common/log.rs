//! Logging helpers

/// Initialize the global logger
///
/// `RUST_LOG` takes precedence over `level` when it is set.
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // A second initialisation (tests, embedding binaries) is not an error.
    let _ = env_logger::Builder::from_env(env).try_init();
}
