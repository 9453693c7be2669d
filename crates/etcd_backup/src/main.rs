use clap::Parser;
use etcd_backup::app;
use etcd_backup::cli::Cli;
use etcd_backup::config::Settings;
use etcd_backup::utils::logging::{build_subscriber, LoggingConfig};
use std::process::ExitCode;
use tracing::instrument::WithSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::load(cli.config.as_deref()).map(|s| s.merge_cli(&cli));

    // Initialize logging; fall back to the flags alone if the settings file is broken
    let logging = match &settings {
        Ok(settings) => settings.logging(),
        Err(_) => LoggingConfig::new(cli.debug_enabled, cli.log_format.unwrap_or_default()),
    };
    let subscriber = build_subscriber(&logging);

    let metrics_textfile = match &settings {
        Ok(settings) => settings.metrics_textfile.clone(),
        Err(_) => cli.metrics_textfile.clone(),
    };

    app::execute(settings, metrics_textfile)
        .with_subscriber(subscriber)
        .await
}
