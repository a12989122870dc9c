use std::fmt::Write as _;

use crate::config::Config;

pub const MIN_COPY_POLL_TRIES: u32 = 1;
pub const MAX_COPY_POLL_TRIES: u32 = 100;
pub const MAX_COPY_POLL_INTERVAL_MS: u32 = 1000;
pub const MAX_PASTE_SETTLE_MS: u32 = 5000;

/// Collects every out of range timing value. `None` when all values are acceptable.
pub fn find_timing_violations(config: &Config) -> Option<String> {
    let mut violations = Vec::new();

    if !(MIN_COPY_POLL_TRIES..=MAX_COPY_POLL_TRIES).contains(&config.copy_poll_tries) {
        violations.push(format!(
            "'copy_poll_tries' is {}, expected {MIN_COPY_POLL_TRIES}..={MAX_COPY_POLL_TRIES}",
            config.copy_poll_tries
        ));
    }

    if config.copy_poll_interval_ms > MAX_COPY_POLL_INTERVAL_MS {
        violations.push(format!(
            "'copy_poll_interval_ms' is {}, expected at most {MAX_COPY_POLL_INTERVAL_MS}",
            config.copy_poll_interval_ms
        ));
    }

    if config.paste_settle_ms > MAX_PASTE_SETTLE_MS {
        violations.push(format!(
            "'paste_settle_ms' is {}, expected at most {MAX_PASTE_SETTLE_MS}",
            config.paste_settle_ms
        ));
    }

    if violations.is_empty() {
        return None;
    }

    let mut error = String::from("Invalid timing settings:\n\n");
    for v in &violations {
        // `String` implements `fmt::Write` infallibly.
        let _ = writeln!(error, "- {v}");
    }
    Some(error)
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        match find_timing_violations(self) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
