use alloy::primitives::Address;
use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use pong_audit::matching::{audit, AuditReport};
use pong_audit::report::{
    audit_document, render_events_table, render_summary_table, response_stats, short_hash,
};
use pong_data::chain::EventFetcher;
use pong_data::contract::addresses;
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct AppContext {
    rpc_url: Option<String>,
    contract: Address,
}

#[derive(Parser, Debug)]
#[command(name = "pong-checker")]
#[command(about = "Verifies that a candidate pong bot answered every ping")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Monitored ping/pong contract address.
    #[arg(long, global = true, default_value_t = addresses::PING_PONG)]
    contract: Address,

    /// Directory for per-candidate log files.
    #[arg(long, global = true, default_value = "logs")]
    logs_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Audit a candidate bot's pongs against the contract's pings.
    Check(CheckArgs),
    /// List raw ping/pong events in a block range.
    Events(EventsArgs),
    /// Report RPC connectivity and chain head.
    Status(StatusArgs),
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Candidate bot address whose pongs are audited.
    #[arg(long)]
    bot: Address,

    /// Block the candidate started answering from.
    #[arg(long)]
    start_block: u64,

    /// Last block to audit (defaults to the chain head).
    #[arg(long)]
    end_block: Option<u64>,

    /// Output format: table (default) or json.
    #[arg(long, default_value = "table")]
    output: String,
}

#[derive(Args, Debug)]
struct EventsArgs {
    #[arg(long)]
    start_block: u64,

    #[arg(long)]
    end_block: Option<u64>,

    /// Only list pongs sent by this address.
    #[arg(long)]
    bot: Option<Address>,
}

#[derive(Args, Debug)]
struct StatusArgs {
    /// Also count pings/pongs emitted since this block.
    #[arg(long)]
    start_block: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // The check command also logs to a file named after the candidate.
    let log_file = match &cli.command {
        Commands::Check(args) => Some(candidate_log_path(&cli.logs_dir, args.bot)?),
        _ => None,
    };
    init_tracing(cli.verbose, cli.quiet, log_file.as_deref())?;

    let ctx = AppContext {
        rpc_url: std::env::var("PONG_RPC_URL").ok(),
        contract: cli.contract,
    };

    match cli.command {
        Commands::Check(args) => handle_check(&ctx, args).await,
        Commands::Events(args) => handle_events(&ctx, args).await,
        Commands::Status(args) => handle_status(&ctx, args).await,
    }
}

fn init_tracing(verbose: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .wrap_err("failed to initialize tracing filter")?;

    let stdout_layer = tracing_subscriber::fmt::layer();

    match log_file {
        Some(path) => {
            let file = open_candidate_log(path)?;
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Arc::new(file));
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .with(file_layer)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .init();
        }
    }

    Ok(())
}

/// Path of the append-only log file for one candidate, creating the logs
/// directory if needed.
fn candidate_log_path(logs_dir: &Path, bot: Address) -> Result<PathBuf> {
    ensure_dir(logs_dir)?;
    Ok(logs_dir.join(format!("{}.log", bot)))
}

/// Opens a candidate log file in append mode, creating it on first use.
fn open_candidate_log(path: &Path) -> Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .wrap_err_with(|| format!("failed to open log file {}", path.display()))
}

async fn handle_check(ctx: &AppContext, args: CheckArgs) -> Result<()> {
    let rpc_url = ctx
        .rpc_url
        .as_deref()
        .ok_or_else(|| eyre!("PONG_RPC_URL is required for check command"))?;

    info!(
        bot = %args.bot,
        start_block = args.start_block,
        "starting to review pongs for candidate"
    );

    let fetcher = EventFetcher::new(rpc_url, ctx.contract).await?;
    let end_block = match args.end_block {
        Some(block) => block,
        None => fetcher.latest_block().await?,
    };
    if args.start_block > end_block {
        return Err(eyre!(
            "invalid range: start-block {} is greater than end-block {}",
            args.start_block,
            end_block
        ));
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .wrap_err("failed to create progress style")?,
    );
    pb.set_message("fetching ping/pong events from RPC");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let pings = fetcher
        .fetch_pings(args.start_block, end_block)
        .await
        .wrap_err("failed to fetch ping events")?;
    let pongs = fetcher
        .fetch_pongs(args.start_block, end_block, Some(args.bot))
        .await
        .wrap_err("failed to fetch pong events")?;
    pb.finish_with_message("fetch completed");

    info!(pings = pings.len(), pongs = pongs.len(), "fetched events");

    let report = audit(&pings, &pongs);
    log_findings(&report);
    log_invalid_pongs(&fetcher, &report).await;
    log_missing_pings(&report);

    let stats = response_stats(&report.matched);
    match args.output.to_lowercase().as_str() {
        "table" => {
            let table =
                render_summary_table(args.bot, args.start_block, end_block, &report, stats.as_ref());
            println!("\n{}\n", table);
        }
        "json" => {
            let document = audit_document(args.bot, args.start_block, end_block, &report, stats);
            let json_str =
                serde_json::to_string_pretty(&document).wrap_err("failed to serialize JSON")?;
            println!("{}", json_str);
        }
        _ => {
            return Err(eyre!(
                "unknown output format '{}'; use 'table' or 'json'",
                args.output
            ))
        }
    }

    info!(
        bot = %args.bot,
        start_block = args.start_block,
        end_block,
        clean = report.is_clean(),
        "check command completed"
    );

    Ok(())
}

/// Logs count parity and duplicate findings.
fn log_findings(report: &AuditReport) {
    if report.pong_count != report.ping_count {
        error!(
            pings = report.ping_count,
            pongs = report.pong_count,
            "there is not one pong event per ping"
        );
    }

    if report.duplicates.is_empty() {
        info!("no duplicated ping hashes in pongs");
    } else {
        let duplicated_pongs: usize = report
            .duplicates
            .iter()
            .map(|duplicate| duplicate.pong_count)
            .sum();
        error!(
            duplicated_hashes = report.duplicates.len(),
            pong_events = duplicated_pongs,
            "duplicated ping hashes in pongs"
        );
        for duplicate in &report.duplicates {
            error!(
                ping_hash = %duplicate.ping_hash,
                pong_count = duplicate.pong_count,
                "ping answered more than once"
            );
        }
    }
}

/// Logs invalid pongs, resolving each echoed hash to its block so a pong
/// that answered a real transaction outside the audited range can be told
/// apart from one echoing a hash that never existed.
async fn log_invalid_pongs(fetcher: &EventFetcher, report: &AuditReport) {
    if report.invalid_pongs.is_empty() {
        info!("all pong events reference a valid ping tx");
        return;
    }

    for ping_hash in &report.invalid_pongs {
        match fetcher.block_number_of(*ping_hash).await {
            Ok(Some(block_number)) => error!(
                %ping_hash,
                block_number,
                "pong echoes a transaction that is not an audited ping"
            ),
            Ok(None) => error!(%ping_hash, "pong echoes an unknown transaction hash"),
            Err(lookup_error) => error!(
                %ping_hash,
                error = %lookup_error,
                "pong not included in the ping txs; block lookup failed"
            ),
        }
    }
}

/// Logs the missing share when the echoed hashes do not cover the pings.
fn log_missing_pings(report: &AuditReport) {
    if report.missing_ratio <= 0.0 {
        return;
    }

    let missing: Vec<String> = report
        .missing_pings
        .iter()
        .map(|ping| ping.tx_hash.to_string())
        .collect();
    error!("{:.2}% of ping txs are missing a pong", report.missing_percent());
    error!(missing_pings = ?missing, "missing pings");
}

async fn handle_events(ctx: &AppContext, args: EventsArgs) -> Result<()> {
    let rpc_url = ctx
        .rpc_url
        .as_deref()
        .ok_or_else(|| eyre!("PONG_RPC_URL is required for events command"))?;

    let fetcher = EventFetcher::new(rpc_url, ctx.contract).await?;
    let end_block = match args.end_block {
        Some(block) => block,
        None => fetcher.latest_block().await?,
    };
    if args.start_block > end_block {
        return Err(eyre!(
            "invalid range: start-block {} is greater than end-block {}",
            args.start_block,
            end_block
        ));
    }

    let pings = fetcher
        .fetch_pings(args.start_block, end_block)
        .await
        .wrap_err("failed to fetch ping events")?;
    let pongs = fetcher
        .fetch_pongs(args.start_block, end_block, args.bot)
        .await
        .wrap_err("failed to fetch pong events")?;

    println!("\n{}\n", render_events_table(&pings, &pongs));

    info!(
        start_block = args.start_block,
        end_block,
        pings = pings.len(),
        pongs = pongs.len(),
        "events command completed"
    );

    Ok(())
}

async fn handle_status(ctx: &AppContext, args: StatusArgs) -> Result<()> {
    let rpc_url = ctx
        .rpc_url
        .as_deref()
        .ok_or_else(|| eyre!("PONG_RPC_URL is required for status command"))?;

    let fetcher = EventFetcher::new(rpc_url, ctx.contract).await?;
    let latest = fetcher.latest_block().await?;

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["RPC Connection".to_string(), "ok".to_string()]);
    table.add_row(vec!["Chain Head".to_string(), latest.to_string()]);
    table.add_row(vec!["Contract".to_string(), ctx.contract.to_string()]);

    if let Some(start_block) = args.start_block {
        if start_block > latest {
            return Err(eyre!(
                "invalid range: start-block {} is beyond chain head {}",
                start_block,
                latest
            ));
        }
        let pings = fetcher
            .fetch_pings(start_block, latest)
            .await
            .wrap_err("failed to fetch ping events")?;
        let pongs = fetcher
            .fetch_pongs(start_block, latest, None)
            .await
            .wrap_err("failed to fetch pong events")?;

        table.add_row(vec![
            "Pings Since Start".to_string(),
            pings.len().to_string(),
        ]);
        table.add_row(vec![
            "Pongs Since Start".to_string(),
            pongs.len().to_string(),
        ]);
        if let Some(last_ping) = pings.last() {
            table.add_row(vec![
                "Last Ping".to_string(),
                format!(
                    "block {} ({})",
                    last_ping.block_number,
                    short_hash(&last_ping.tx_hash)
                ),
            ]);
        }
    }

    println!("\n{}\n", table);

    info!(chain_head = latest, contract = %ctx.contract, "status command completed");

    Ok(())
}

fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .wrap_err_with(|| format!("failed to create dir {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn candidate_log_path_creates_logs_dir_and_names_file_after_bot() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let logs_dir = dir.path().join("logs");

        let path = candidate_log_path(&logs_dir, Address::repeat_byte(0xbb))
            .expect("log path should resolve");

        assert!(logs_dir.is_dir());
        let file_name = path.file_name().and_then(|name| name.to_str()).unwrap();
        assert!(file_name.starts_with("0x"));
        assert!(file_name.ends_with(".log"));
    }

    #[test]
    fn candidate_log_appends_across_runs() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let path = candidate_log_path(dir.path(), Address::repeat_byte(0xbb))
            .expect("log path should resolve");

        let mut first = open_candidate_log(&path).expect("first open should succeed");
        writeln!(first, "first run").expect("write should succeed");
        drop(first);

        let mut second = open_candidate_log(&path).expect("reopen should succeed");
        writeln!(second, "second run").expect("write should succeed");
        drop(second);

        let content = std::fs::read_to_string(&path).expect("log should be readable");
        assert!(content.contains("first run"));
        assert!(content.contains("second run"));
    }
}
