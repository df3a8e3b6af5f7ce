//! Built-in logger bootstrap: enabled by the default Cargo feature
//! `builtin_env_logger`, harmless to call twice, and never overrides a
//! logger the host program already installed.

use log::debug;

/// Attempt to install an `env_logger`. Does nothing if the
/// `builtin_env_logger` feature is disabled, or if a logger is already
/// registered.
pub(crate) fn try_init() {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            let result = env_logger::try_init_from_env(
                env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
            );
            match result {
                Ok(()) => debug!("granule-gc initialized the logger."),
                Err(e) => debug!("granule-gc failed to initialize the built-in env_logger: {e}"),
            }
        } else {
            debug!("granule-gc didn't initialize the built-in env_logger; the \"builtin_env_logger\" feature is disabled.");
        }
    }
}
