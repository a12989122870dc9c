#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(windows)]
fn main() -> windows::core::Result<()> {
    use recaps::{options::StartupOptions, platform, utils::helpers};

    recaps::utils::tracing::init_tracing();

    let options = StartupOptions::from_args(std::env::args().skip(1));

    let Some(_guard) = helpers::single_instance_guard()? else {
        tracing::info!(msg = "already_running");
        helpers::notify_already_running();
        std::process::exit(1);
    };

    if let Err(e) = platform::win::run(options) {
        tracing::error!(msg = "run_failed", error = ?e);
        helpers::notify_fatal("Recaps failed to start.", &e);
        return Err(e);
    }
    Ok(())
}

#[cfg(not(windows))]
fn main() -> std::process::ExitCode {
    eprintln!("recaps only runs on Windows");
    std::process::ExitCode::FAILURE
}
