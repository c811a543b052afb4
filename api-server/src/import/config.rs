use std::env;

/// Default number of users written per bulk insert.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default cap on username candidates tried for one row.
pub const DEFAULT_MAX_USERNAME_ATTEMPTS: usize = 1000;

/// Default upper bound (inclusive) of the random username suffix.
pub const DEFAULT_USERNAME_SUFFIX_MAX: u32 = 1000;

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

/// Tunables for one import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    pub batch_size: usize,
    pub max_username_attempts: usize,
    pub username_suffix_max: u32,
}

impl ImportConfig {
    pub fn from_env() -> Self {
        Self {
            batch_size: env_usize("IMPORT_BATCH_SIZE", DEFAULT_BATCH_SIZE),
            max_username_attempts: env_usize(
                "IMPORT_USERNAME_MAX_ATTEMPTS",
                DEFAULT_MAX_USERNAME_ATTEMPTS,
            ),
            username_suffix_max: env_u32("IMPORT_USERNAME_SUFFIX_MAX", DEFAULT_USERNAME_SUFFIX_MAX),
        }
        .normalized()
    }

    /// Override the batch size, keeping it at least 1.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self.normalized()
    }

    fn normalized(mut self) -> Self {
        self.batch_size = self.batch_size.max(1);
        self.max_username_attempts = self.max_username_attempts.max(1);
        self
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_username_attempts: DEFAULT_MAX_USERNAME_ATTEMPTS,
            username_suffix_max: DEFAULT_USERNAME_SUFFIX_MAX,
        }
    }
}
