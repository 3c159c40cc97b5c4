use anyhow::Result;
use clap::Parser;
use endpoint_finder::cli::{Cli, Commands};
use endpoint_finder::ledger::ScanLedger;
use endpoint_finder::report::{ScanReport, write_report};
use endpoint_finder::scan::Scanner;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = parse_cli();
    init_logging(cli.verbose);

    match cli.command.clone() {
        Commands::Scan {
            roots,
            output,
            exclude,
            deadline,
            compact,
        } => {
            let roots = usable_roots(roots);
            if roots.is_empty() {
                anyhow::bail!("没有可用的扫描根路径");
            }

            let ledger = ScanLedger::new();
            let deadline = deadline.map(|secs| Instant::now() + Duration::from_secs(secs));
            let scanner = Scanner::new(&ledger, &exclude, deadline);
            let descriptors = scanner.scan_roots(&roots);

            info!(
                "scanned {} containers, {} routable units, {} endpoints",
                ledger.containers_scanned(),
                ledger.routable_units(),
                ledger.endpoints()
            );

            let report = ScanReport::new(descriptors, &ledger);
            write_report(&report, output.as_deref(), compact)?;
        }
    }

    Ok(())
}

fn usable_roots(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    roots
        .into_iter()
        .filter(|root| {
            if root.exists() {
                true
            } else {
                warn!("skipping missing root: {}", root.display());
                false
            }
        })
        .collect()
}

fn parse_cli() -> Cli {
    let args: Vec<String> = std::env::args().collect();
    Cli::parse_from(rewrite_args_for_implicit_scan(args))
}

fn rewrite_args_for_implicit_scan(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let subcommands = ["scan", "help"];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if a == "-o" || a == "--output" || a == "--exclude" || a == "--deadline" {
            idx += 2;
            continue;
        }

        if a.starts_with('-') {
            idx += 1;
            continue;
        }

        break;
    }

    if idx < args.len() {
        let token = args[idx].as_str();
        if !subcommands.contains(&token) {
            args.insert(idx, "scan".to_string());
        }
    }

    args
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
