//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `capri_core` linkage and print version metadata.
//! - Optionally configure a persistence unit and report where it resolved.
//!
//! Usage: `capri_cli [UNIT [CONFIG_PATH]]`. Without `CONFIG_PATH` the unit is
//! resolved from `$CAPRI_PERSISTENCE_CONFIG` or `persistence.toml`. Setting
//! `CAPRI_LOG_DIR` to an absolute directory enables file logging.

use capri_core::{
    configure, configure_with, default_log_level, global_factory, init_logging,
    PersistenceConfig, ServiceError,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("capri_core ping={}", capri_core::ping());
    println!("capri_core version={}", capri_core::core_version());

    if let Ok(log_dir) = std::env::var("CAPRI_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let mut args = std::env::args().skip(1);
    let Some(unit) = args.next() else {
        return ExitCode::SUCCESS;
    };

    let configured = match args.next() {
        Some(path) => PersistenceConfig::load_from_file(&path)
            .map_err(ServiceError::from)
            .and_then(|config| configure_with(&config, &unit)),
        None => configure(&unit),
    };

    match configured.and_then(|()| global_factory()) {
        Ok(factory) => {
            println!(
                "unit={} location={} status=ok",
                factory.unit_name(),
                factory.location()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("unit={unit} status=error error={err}");
            ExitCode::FAILURE
        }
    }
}
