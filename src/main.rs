use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use folio::cli::{exit_code, parse_args, run, USAGE};
use folio::services::Services;

fn main() {
    // Logs go to stderr so command output on stdout stays machine readable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = real_main(&argv) {
        error!(target: "startup", "{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

fn real_main(argv: &[String]) -> anyhow::Result<()> {
    let args = match parse_args(argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", USAGE);
            return Err(e);
        }
    };
    let config = args.resolve_config()?;
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "startup",
        "folio starting: RUST_LOG='{}', snapshot={:?}, inactivity_secs={}",
        rust_log, config.snapshot_path, config.inactivity_window_secs
    );
    let services = Services::start(config)?;
    run(&args, &services)?;
    services.shutdown()?;
    Ok(())
}
