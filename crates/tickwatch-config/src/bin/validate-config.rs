//! Config validation CLI tool
//!
//! Validates a tickwatch configuration file and reports any errors.

use std::path::PathBuf;
use std::process::ExitCode;
use tickwatch_util::default_config_path;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a tickwatch configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match tickwatch_config::load_config(&config_path) {
        Ok(bundle) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", tickwatch_config::CURRENT_CONFIG_VERSION);
            println!("  Portal: {}", bundle.settings.portal_url);
            println!(
                "  Check interval: every {}",
                tickwatch_util::format_duration(std::time::Duration::from_secs(
                    u64::from(bundle.settings.check_interval_minutes) * 60
                ))
            );
            if bundle.settings.business_hours_only {
                println!(
                    "  Business hours: weekdays {:02}:00-{:02}:00",
                    bundle.settings.business_hours.start_hour,
                    bundle.settings.business_hours.end_hour
                );
            } else {
                println!("  Business hours: not enforced");
            }
            println!(
                "  Notifications: {}",
                if bundle.settings.enable_notifications { "on" } else { "off" }
            );
            if !bundle.settings.has_credentials() {
                println!();
                println!("Note: no credentials set; monitoring will not start until the");
                println!("username and password are filled in via the UI or this file.");
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                tickwatch_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                tickwatch_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                tickwatch_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                tickwatch_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        tickwatch_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
