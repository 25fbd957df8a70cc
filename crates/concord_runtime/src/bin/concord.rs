//! Concord CLI entry point.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use concord_engine::{EngineConfig, Retention};
use concord_runtime::{Repl, save_log};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "concord=info";

/// CLI configuration parsed from arguments.
#[derive(Default)]
struct CliConfig {
    files: Vec<PathBuf>,
    batch_mode: bool,
    show_help: bool,
    show_version: bool,
    trace: bool,
    discard_flows: bool,
    max_depth: Option<u32>,
    export: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError: {e}\x1b[0m");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let mut config = CliConfig::default();

    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => config.show_help = true,
            "-V" | "--version" => config.show_version = true,
            "-b" | "--batch" => config.batch_mode = true,
            "--trace" => config.trace = true,
            "--discard-flows" => config.discard_flows = true,
            "--max-depth" => {
                let value = args.next().ok_or("--max-depth requires a value")?;
                config.max_depth = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid --max-depth value: {value}"))?,
                );
            }
            "--export" => {
                let value = args.next().ok_or("--export requires a path")?;
                config.export = Some(PathBuf::from(value));
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {other}").into());
            }
            path => config.files.push(PathBuf::from(path)),
        }
    }

    Ok(config)
}

fn engine_config(cli: &CliConfig) -> EngineConfig {
    let mut config = if cli.trace {
        EngineConfig::debug()
    } else {
        EngineConfig::new()
    };
    if let Some(depth) = cli.max_depth {
        config = config.with_max_cascade_depth(depth);
    }
    if cli.discard_flows {
        config = config.with_retention(Retention::DiscardCompletedFlows);
    }
    config
}

/// The user's `RUST_LOG` when set and valid, otherwise `concord=info`.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|spec| !spec.trim().is_empty())
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn run(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let cli = parse_args(args)?;

    if cli.show_help {
        print_help();
        return Ok(());
    }

    if cli.show_version {
        println!("concord {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let config = engine_config(&cli);
    info!(
        max_cascade_depth = config.max_cascade_depth,
        tracing = cli.trace,
        discard_flows = cli.discard_flows,
        "starting"
    );

    let mut repl = Repl::new(config)?;

    for file in &cli.files {
        repl.eval_file(file)?;
    }

    if !cli.batch_mode {
        if !cli.files.is_empty() {
            repl = repl.without_banner();
        }
        repl.run()?;
    }

    if let Some(path) = &cli.export {
        save_log(repl.app().engine(), path)?;
        info!(path = %path.display(), "action log exported");
    }

    Ok(())
}

fn print_help() {
    println!(
        "\x1b[1mConcord\x1b[0m - Declarative synchronization of independent concepts

\x1b[1mUSAGE:\x1b[0m
    concord [OPTIONS] [FILES...]

\x1b[1mARGUMENTS:\x1b[0m
    [FILES...]    Request scripts to run before starting the REPL

\x1b[1mOPTIONS:\x1b[0m
    -h, --help           Print help information
    -V, --version        Print version information
    -b, --batch          Run files and exit (no REPL)
    --max-depth N        Maximum waves per cascade (default 32)
    --trace              Record engine trace events (see :trace)
    --discard-flows      Drop a flow's records once its cascade completes
    --export PATH        Write the action log as MessagePack on exit

\x1b[1mENVIRONMENT:\x1b[0m
    RUST_LOG             Log filter (default concord=info)

\x1b[1mEXAMPLES:\x1b[0m
    concord                              Start interactive REPL
    concord -b demo.txt                  Run demo.txt and exit
    concord --trace --export log.msgpack Trace, then save the log

\x1b[1mREPL COMMANDS:\x1b[0m
    POST /quizzes owner=u1 title=Foo     Submit a request
    :log [FLOW]                          Show the action log
    :trace [FLOW], :trace on|off         Show or toggle engine tracing
    :why SEQ                             Explain a record
    :routes, :rules                      List routes or rules
    :export PATH                         Write the action log
    :quit, Ctrl+D                        Exit"
    );
}
