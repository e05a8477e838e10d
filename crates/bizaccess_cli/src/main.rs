//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `bizaccess_core` linkage with deterministic output.
//! - When `BIZACCESS_*` variables are set, open the configured tenant and
//!   report how many access grants it holds.

use bizaccess_core::{AccessListQuery, AccessService, ConfigError, ServiceConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("bizaccess_core ping={}", bizaccess_core::ping());
    println!("bizaccess_core version={}", bizaccess_core::core_version());

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(ConfigError::MissingVar(_)) => return ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Ok(log_dir) = std::env::var("BIZACCESS_LOG_DIR") {
        if let Err(err) = bizaccess_core::init_service_logging(&config, &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match report_grants(&config) {
        Ok(count) => {
            println!("business_id={} grants={count}", config.business_id);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("event=cli_report module=cli status=error error_code={}", err.code());
            eprintln!("error[{}]: {err}", err.code());
            ExitCode::FAILURE
        }
    }
}

fn report_grants(config: &ServiceConfig) -> Result<u64, bizaccess_core::AccessServiceError> {
    let service = AccessService::open(config)?;
    let page = service.list(&AccessListQuery {
        limit: Some(0),
        ..AccessListQuery::default()
    })?;
    service.end_service()?;
    Ok(page.total_size)
}
