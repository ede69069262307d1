//! blockarena: drives the chained-block arenas through demo scenarios.

use blockarena_lib::{app, config, errors};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::AppConfig::parse();
    if let Err(err) = app::run(&config) {
        eprintln!("Error: {err:#}");
        std::process::exit(errors::exit_code(&err));
    }
}
