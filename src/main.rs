#![forbid(unsafe_code)]

use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use microbench_ci::core::HostRuntime;
use microbench_ci::run_cmd::{self, Startup};

fn init_tracing(verbose: bool) {
    let env = std::env::var("MICROBENCH_LOG").unwrap_or_else(|_| {
        if verbose { "microbench_ci=debug".to_string() } else { "microbench_ci=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn main() {
    color_eyre::install().ok();
    // The host check comes before clap sees the flags.
    let args = match run_cmd::startup(&HostRuntime::detect(), std::env::args_os()) {
        Ok(Startup::Ready(args)) => args,
        // Usage errors exit with status 2.
        Ok(Startup::Usage(e)) => e.exit(),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(run_cmd::EXIT_FAILURE);
        }
    };
    init_tracing(!args.quiet);

    let result: anyhow::Result<i32> = run_cmd::run(args).map_err(anyhow::Error::from);
    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(run_cmd::EXIT_FAILURE);
        }
    }
}
