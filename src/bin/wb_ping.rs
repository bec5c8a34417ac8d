//! wb-ping: connectivity and credential check for the seller API
//!
//! Usage:
//!   wb_ping [ping] [--timeout <duration>] [--base-url <url>] [--config <file>]
//!   wb_ping config [--config <file>]       Show the effective configuration
//!   wb_ping version

use std::process::ExitCode;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wb_api_client::{ApiClient, ClientConfig, RequestContext};

const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("WB_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, rest) = match args.first().map(String::as_str) {
        Some(cmd) if !cmd.starts_with('-') => (cmd.to_string(), &args[1..]),
        _ => ("ping".to_string(), &args[..]),
    };

    match command.as_str() {
        "ping" => cmd_ping(rest),
        "config" => cmd_config(rest),
        "version" | "--version" | "-V" => {
            println!("wb_ping {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        "help" | "--help" | "-h" => {
            print_usage();
            ExitCode::SUCCESS
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!(
        r#"wb_ping: seller API connectivity check

USAGE:
    wb_ping [COMMAND] [OPTIONS]

COMMANDS:
    ping                        Call /ping and report the outcome (default)
    config                      Print the effective configuration (key masked)
    version                     Show version information
    help                        Show this help message

OPTIONS:
    --timeout <duration>        Overall deadline, e.g. 10s (default 10s)
    --base-url <url>            Override WB_BASE_URL
    --config <file>             Read the `wb:` section of a YAML file

ENVIRONMENT:
    WB_API_KEY, WB_BASE_URL, WB_RATE_LIMIT, WB_BURST_LIMIT,
    WB_RETRY_ATTEMPTS, WB_TIMEOUT   Client configuration
    WB_LOG                          Log filter (default warn)"#
    );
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn load_config(args: &[String]) -> Result<ClientConfig, String> {
    let mut cfg = match flag_value(args, "--config") {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {path}: {e}"))?;
            let doc: serde_yaml::Value =
                serde_yaml::from_str(&raw).map_err(|e| format!("invalid YAML in {path}: {e}"))?;
            let section = doc.get("wb").cloned().unwrap_or(doc);
            let section =
                serde_yaml::to_string(&section).map_err(|e| format!("invalid YAML: {e}"))?;
            let mut cfg = ClientConfig::from_yaml_str(&section).map_err(|e| e.to_string())?;
            if let Ok(key) = std::env::var("WB_API_KEY") {
                cfg.api_key = key;
            }
            cfg
        }
        None => ClientConfig::from_env().map_err(|e| e.to_string())?,
    };
    if let Some(url) = flag_value(args, "--base-url") {
        cfg.base_url = url.to_string();
    }
    Ok(cfg)
}

fn cmd_config(args: &[String]) -> ExitCode {
    let cfg = match load_config(args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let key: Vec<char> = cfg.api_key.chars().collect();
    let masked = match key.len() {
        0 => "<unset>".to_string(),
        n if n <= 8 => "****".to_string(),
        n => format!(
            "{}…{}",
            key[..4].iter().collect::<String>(),
            key[n - 4..].iter().collect::<String>()
        ),
    };
    println!("api_key:          {masked}");
    println!("base_url:         {}", cfg.base_url);
    println!("rate_limit:       {}/min", cfg.rate_limit);
    println!("burst_limit:      {}", cfg.burst_limit);
    println!("retry_attempts:   {}", cfg.retry_attempts);
    println!("timeout:          {}", humantime::format_duration(cfg.timeout));
    println!(
        "retry_wait:       {}",
        humantime::format_duration(cfg.default_retry_wait)
    );
    println!("retry_hints:      {}", cfg.retry_hint_headers.join(", "));
    ExitCode::SUCCESS
}

fn cmd_ping(args: &[String]) -> ExitCode {
    let deadline = match flag_value(args, "--timeout") {
        Some(raw) => match humantime::parse_duration(raw) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Error: invalid --timeout {raw:?}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => DEFAULT_DEADLINE,
    };

    let cfg = match load_config(args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let client = match ApiClient::new(cfg) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: cannot start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async {
        let ctx = RequestContext::new().with_timeout(deadline);
        match client.ping(&ctx).await {
            Ok(pong) => {
                println!("OK {}", pong.ts);
                ExitCode::SUCCESS
            }
            Err(err) => {
                let diagnosis = err.diagnose();
                println!("{}: {}", diagnosis.tag(), diagnosis.human_message());
                eprintln!("  {err}");
                ExitCode::FAILURE
            }
        }
    })
}
