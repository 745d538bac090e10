//! Post command service entry point.

use std::process::ExitCode;

use post_cmd::config::Config;
use post_cmd::error::AppError;
use post_cmd::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    if let Err(err) = telemetry::init_tracing(&config) {
        eprintln!("{}", AppError::from(err));
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "post command service failed");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    tracing::info!(
        log_format = %config.log_format,
        metrics_enabled = config.metrics_enabled,
        "starting post command service"
    );

    // 2. Install Prometheus metrics recorder
    let metrics_handle = if config.metrics_enabled {
        Some(telemetry::install_metrics()?)
    } else {
        None
    };

    // 3. Wire store, publisher, handlers and dispatcher
    let app = post_cmd::create_app()?;

    // 4. Drive a post through its lifecycle
    let report = post_cmd::run_demo(&app, &config.demo_author).await?;
    tracing::info!(
        post_id = %report.post_id,
        version = %report.version,
        active = report.active,
        comments = report.comment_count,
        published = report.published,
        "demo finished"
    );

    if let Some(handle) = metrics_handle {
        println!("{}", handle.render());
    }

    Ok(())
}
