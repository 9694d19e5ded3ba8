//! stderr logging through `env_logger`
//!
//! Silent below `warn` unless `GUEST_BOOT_LOG` says otherwise, so a normal
//! boot prints nothing before init takes over.

use env_logger::{Builder, Env, Target};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "GUEST_BOOT_LOG";

/// Filter used when `LOG_ENV` is unset
pub const DEFAULT_FILTER: &str = "warn";

/// Install the logger. A logger that is already installed is kept.
pub fn init() {
    let env = Env::new().filter_or(LOG_ENV, DEFAULT_FILTER);
    let _ = Builder::from_env(env)
        .target(Target::Stderr)
        .format_timestamp(None)
        .try_init();
}
