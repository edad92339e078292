use assay_core::logging::{self, LogLevel};
use assay_runner::cli::{Cli, Commands};
use clap::Parser;
use colored::Colorize;

fn main() {
    let cli = Cli::parse();
    let is_invoke = matches!(cli.command, Commands::Invoke(_));

    logging::set_log_level(LogLevel::from_verbosity(cli.verbose));
    logging::set_log_level_from_env();

    let result = assay_runner::load_config(&cli).and_then(|config| {
        if let Err(e) = logging::init_session_logger(&config.logging) {
            eprintln!(
                "{}",
                format!("[WARN] Failed to initialize session logger: {}", e).yellow()
            );
            logging::init_stderr_logger();
        }
        assay_runner::run(cli, config)
    });

    if let Err(e) = result {
        tracing::error!("{}", e);
        if is_invoke {
            match serde_json::to_string(&e.body()) {
                Ok(body) => println!("{}", body),
                Err(_) => eprintln!("{}", format!("[ERROR] {}", e).red()),
            }
        } else {
            eprintln!("{}", format!("[ERROR] {}", e).red());
        }
        std::process::exit(e.exit_code());
    }
}
