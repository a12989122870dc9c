#[cfg(feature = "debug-tracing")]
use std::sync::Mutex;

#[cfg(feature = "debug-tracing")]
use tracing_appender::non_blocking::WorkerGuard;
#[cfg(feature = "debug-tracing")]
use tracing_subscriber::EnvFilter;

/// Keeps the non blocking writer flushing until the process exits.
#[cfg(feature = "debug-tracing")]
static TRACING_GUARD: Mutex<Option<WorkerGuard>> = Mutex::new(None);

/// Installs the global subscriber.
///
/// Events go to `logs/recaps.log`, rotated hourly. `RUST_LOG` overrides the default `trace`
/// filter.
#[cfg(feature = "debug-tracing")]
pub fn init_tracing() {
    if !cfg!(debug_assertions) {
        return;
    }

    let default_filter = "trace";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_appender = tracing_appender::rolling::hourly("./logs", "recaps.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_level(true)
        .with_target(true);

    if subscriber.try_init().is_ok() {
        store_tracing_guard(guard);
        tracing::info!("tracing initialized");
    }
}

#[cfg(feature = "debug-tracing")]
fn store_tracing_guard(guard: WorkerGuard) {
    match TRACING_GUARD.lock() {
        Ok(mut slot) => *slot = Some(guard),
        Err(poisoned) => *poisoned.into_inner() = Some(guard),
    }
}

#[cfg(not(feature = "debug-tracing"))]
pub fn init_tracing() {}
