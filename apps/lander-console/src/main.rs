use clap::{Parser, ValueEnum};
use lander_console::bootstrap::{self, ConfigOverrides};
use lander_console::headless::{HeadlessArgs, HeadlessMode};
use lander_console::{logging, TuiOpts};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "lander-console")]
#[command(about = "Lunar Lander training console (TUI) + headless one-shot runner.", version)]
struct Cli {
    /// Run without TUI and exit after the selected mode completes.
    #[arg(long)]
    headless: bool,

    /// Headless mode: health | status | start | stop | evaluate | video | weights | videos
    #[arg(long)]
    mode: Option<Mode>,

    /// Config file path (TOML). If omitted, uses env LANDER_CONFIG, then defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// API base URL, e.g. http://localhost:8000/api/v1. Falls back to env LANDER_API_BASE.
    #[arg(long)]
    api_base: Option<String>,

    /// Per-request timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Weights file for evaluate/video (headless only). Defaults to the first listed.
    #[arg(long)]
    weights: Option<String>,

    /// Log format for headless mode.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Mode {
    Health,
    Status,
    Start,
    Stop,
    Evaluate,
    Video,
    Weights,
    Videos,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let log_store = Arc::new(parking_lot::Mutex::new(logging::LogStore::new(
        logging::DEFAULT_LOG_LINES,
    )));
    let sink = if cli.headless {
        LogSink::Stderr(cli.log_format)
    } else {
        LogSink::Store(log_store.clone())
    };
    if let Err(err) = init_tracing(sink) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = init_metrics() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let config_path = bootstrap::config_path_from(cli.config);
    let overrides = ConfigOverrides {
        api_base: bootstrap::api_base_from(cli.api_base),
        timeout_ms: cli.timeout_ms,
    };
    let config = match bootstrap::resolve_config(config_path.as_deref(), &overrides) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    if cli.headless {
        let mode = match cli.mode {
            Some(m) => m,
            None => {
                eprintln!("error: --mode is required with --headless");
                std::process::exit(1);
            }
        };

        let mode = match mode {
            Mode::Health => HeadlessMode::Health,
            Mode::Status => HeadlessMode::Status,
            Mode::Start => HeadlessMode::Start,
            Mode::Stop => HeadlessMode::Stop,
            Mode::Evaluate => HeadlessMode::Evaluate,
            Mode::Video => HeadlessMode::Video,
            Mode::Weights => HeadlessMode::Weights,
            Mode::Videos => HeadlessMode::Videos,
        };

        let result = lander_console::headless::run_headless(
            &config,
            HeadlessArgs {
                mode,
                weights: cli.weights,
            },
        );

        match result {
            Ok(output) => {
                println!(
                    "{}",
                    serde_json::to_string(&output.json)
                        .unwrap_or_else(|_| "{\"status\":\"error\",\"error\":\"json\"}".to_string())
                );
                std::process::exit(output.exit_code());
            }
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(err.exit_code());
            }
        }
    }

    let opts = TuiOpts { config, log_store };
    if let Err(err) = lander_console::run(opts) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

enum LogSink {
    Store(Arc<parking_lot::Mutex<logging::LogStore>>),
    Stderr(LogFormat),
}

fn init_tracing(sink: LogSink) -> Result<(), String> {
    let filter = std::env::var("LANDER_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    match sink {
        LogSink::Store(store) => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(logging::LogMakeWriter::new(store))
            .try_init(),
        LogSink::Stderr(LogFormat::Json) => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init(),
        LogSink::Stderr(LogFormat::Text) => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init(),
    }
    .map_err(|err| format!("failed to init tracing: {err}"))
}

#[cfg(feature = "prometheus")]
fn init_metrics() -> Result<Option<SocketAddr>, String> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let Some(raw) = std::env::var("LANDER_METRICS_ADDR").ok() else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let addr: SocketAddr = raw
        .parse()
        .map_err(|err| format!("invalid LANDER_METRICS_ADDR (expected host:port): {err}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| format!("failed to install prometheus exporter: {err}"))?;

    tracing::info!(metrics_addr = %addr, "prometheus metrics exporter enabled");
    Ok(Some(addr))
}

#[cfg(not(feature = "prometheus"))]
fn init_metrics() -> Result<Option<SocketAddr>, String> {
    Ok(None)
}
