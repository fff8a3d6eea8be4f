use reviewnotes::{cli, telemetry};

fn main() {
    let cli = cli::parse_from(std::env::args_os());

    let config = match cli::load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let _telemetry_guard =
        telemetry::init(telemetry::TelemetryConfig::new(cli.verbose, config.logging.clone()));

    if let Err(e) = cli::run(cli, config) {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("{}", cli::error_message(&e));
        std::process::exit(1);
    }
}
