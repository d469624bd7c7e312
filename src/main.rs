use ssoenv::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    let code = match cli::run(cli) {
        Ok(code) => code,
        Err(err) => {
            let kind = cli::error_kind(&err);
            tracing::debug!(%kind, "command failed");
            eprintln!("error: {}", cli::report(&err));
            kind.exit_code()
        }
    };
    std::process::exit(code);
}

/// Log to stderr. `RUST_LOG` wins over `--debug`.
fn init_logging(debug: bool) {
    let default = if debug { "ssoenv=debug" } else { "ssoenv=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
