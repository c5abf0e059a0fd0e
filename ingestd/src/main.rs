//! Entrypoint of the ingestd binary
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr,
    clippy::future_not_send
)]

use dotenvy::dotenv;
use ingestd_clap_blocks::tokio::TokioIoConfig;
use observability_deps::tracing::{info, warn};
use tokio_util::sync::CancellationToken;
use trogging::{
    TroggingGuard,
    cli::LoggingConfigBuilderExt,
    tracing_subscriber::{Registry, prelude::*},
};

mod commands {
    pub(crate) mod common;
    pub(crate) mod get;
    pub(crate) mod list;
    pub(crate) mod run;
}

enum ReturnCode {
    Failure = 1,
}

#[derive(Debug, clap::Parser)]
#[clap(
    name = "ingestd",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_flag = true,
    arg(
        clap::Arg::new("help")
            .short('h')
            .long("help")
            .help("Print help information")
            .action(clap::ArgAction::Help)
            .global(true)
    ),
    about = "Assemble chunked XML documents and persist their elements",
    long_about = r#"Assemble chunked XML documents and persist their elements

Examples:
    # Persist every <book> of a catalog to a local directory
    ingestd run --object-store file --data-dir ~/.ingestd --select book catalog.xml

    # Read a document from standard input with debug logging
    cat catalog.xml | ingestd run -vv --object-store file --data-dir ~/.ingestd -

    # List and read back persisted documents
    ingestd list --object-store file --data-dir ~/.ingestd
    ingestd get --object-store file --data-dir ~/.ingestd documents/catalog.xml/00000000000000000000.xml
"#
)]
struct Config {
    #[clap(flatten)]
    runtime_config: TokioIoConfig,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, clap::Parser)]
enum Command {
    /// Read one or more documents and persist their elements
    Run(commands::run::Config),

    /// Print a persisted document
    Get(commands::get::Config),

    /// List persisted documents
    List(commands::list::Config),
}

fn main() -> Result<(), std::io::Error> {
    #[cfg(unix)]
    install_crash_handler(); // attempt to render a useful stacktrace to stderr

    // load all environment variables from .env before doing anything
    load_dotenv();

    let config: Config = clap::Parser::parse();

    let tokio_runtime = config.runtime_config.builder()?.build()?;

    tokio_runtime.block_on(async move {
        fn handle_init_logs(r: Result<TroggingGuard, trogging::Error>) -> TroggingGuard {
            match r {
                Ok(guard) => guard,
                Err(e) => {
                    eprintln!("Initializing logs failed: {e}");
                    std::process::exit(ReturnCode::Failure as _);
                }
            }
        }

        match config.command {
            None => println!("command required, -h/--help for help"),
            Some(Command::Run(config)) => {
                let _tracing_guard =
                    handle_init_logs(init_logs_and_tracing(&config.logging_config));

                let shutdown = CancellationToken::new();
                tokio::spawn(cancel_on_signal(shutdown.clone()));

                if let Err(e) = commands::run::command(config, shutdown).await {
                    eprintln!("Run command failed: {e}");
                    std::process::exit(ReturnCode::Failure as _)
                }
            }
            Some(Command::Get(config)) => {
                if let Err(e) = commands::get::command(config).await {
                    eprintln!("Get command failed: {e}");
                    std::process::exit(ReturnCode::Failure as _)
                }
            }
            Some(Command::List(config)) => {
                if let Err(e) = commands::list::command(config).await {
                    eprintln!("List command failed: {e}");
                    std::process::exit(ReturnCode::Failure as _)
                }
            }
        }
    });

    Ok(())
}

/// Source the .env file before initialising the Config struct - this sets
/// any envs in the file, which the Config struct then uses.
///
/// Precedence is given to existing env variables.
fn load_dotenv() {
    match dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            // Ignore this - a missing env file is not an error, defaults will
            // be applied when initialising the Config struct.
        }
        Err(e) => {
            eprintln!("FATAL Error loading config from: {e}");
            eprintln!("Aborting");
            std::process::exit(1);
        }
    };
}

/// Cancel `shutdown` on the first SIGINT or SIGTERM
async fn cancel_on_signal(shutdown: CancellationToken) {
    match wait_for_signal().await {
        Ok(()) => shutdown.cancel(),
        Err(e) => warn!(%e, "failed to register signal handlers, signals will not cancel ingestion"),
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = term.recv() => info!("Received SIGTERM"),
        _ = int.recv() => info!("Received SIGINT"),
    }
    Ok(())
}

#[cfg(windows)]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received SIGINT");
    Ok(())
}

// Based on ideas from
// https://github.com/servo/servo/blob/f03ddf6c6c6e94e799ab2a3a89660aea4a01da6f/ports/servo/main.rs#L58-L79
#[cfg(unix)]
fn install_crash_handler() {
    unsafe {
        set_signal_handler(libc::SIGSEGV, signal_handler); // handle segfaults
        set_signal_handler(libc::SIGILL, signal_handler); // handle stack overflow and unsupported CPUs
        set_signal_handler(libc::SIGBUS, signal_handler); // handle invalid memory access
    }
}

#[cfg(unix)]
unsafe extern "C" fn signal_handler(sig: i32) {
    use backtrace::Backtrace;
    use std::process::abort;
    let name = std::thread::current()
        .name()
        .map(|n| format!(" for thread \"{n}\""))
        .unwrap_or_default();
    eprintln!("Signal {sig}, Stack trace{name}\n{:?}", Backtrace::new());
    abort();
}

// based on https://github.com/adjivas/sig/blob/master/src/lib.rs#L34-L52
#[cfg(unix)]
unsafe fn set_signal_handler(signal: libc::c_int, handler: unsafe extern "C" fn(libc::c_int)) {
    use libc::{sigaction, sigfillset, sighandler_t};
    unsafe {
        let mut sigset = std::mem::zeroed();

        // Block all signals during the handler.
        if sigfillset(&mut sigset) != -1 {
            // sa_restorer and sa_handler are pointers that may be null, so zeroed is valid.
            let mut action: sigaction = std::mem::zeroed();

            action.sa_mask = sigset;
            action.sa_sigaction = handler as sighandler_t;

            sigaction(signal, &action, std::ptr::null_mut());
        }
    }
}

fn init_logs_and_tracing(
    config: &trogging::cli::LoggingConfig,
) -> Result<TroggingGuard, trogging::Error> {
    let log_layer = trogging::Builder::new()
        .with_default_log_filter("info")
        .with_logging_config(config)
        .build()?;

    let subscriber = Registry::default().with(log_layer);
    trogging::install_global(subscriber)
}
