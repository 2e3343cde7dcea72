use clap::Parser;

use inbox_triage::classify::Classifier;
use inbox_triage::cli::{Args, Command};
use inbox_triage::config::TriageConfig;
use inbox_triage::error::Error;
use inbox_triage::mail::ImapSource;
use inbox_triage::store::TriageStore;
use inbox_triage::triage::{self, ReportedEmail, ScanOptions, ScanOutcome, TriageStats};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Error> {
    match args.command {
        Command::Scan {
            dry_run,
            json,
            verbose,
            account,
        } => {
            // Scan needs IMAP connection config; validate before any
            // network activity.
            let config = TriageConfig::from_env()?;
            let source = ImapSource::from_config(&config);
            let classifier = Classifier::from_config(&config);
            let store = TriageStore::new(config.state_file.clone());

            let opts = ScanOptions {
                batch_limit: config.batch_limit,
                retention_cap: config.retention_cap,
                dry_run,
                account: account.or(Some(config.imap_user.clone())),
            };
            let outcome = triage::scan(&source, &classifier, &store, &opts).await?;
            print_scan(&outcome, json, verbose || dry_run);
        }
        Command::Report { json, account } => {
            let config = TriageConfig::local_only();
            let store = TriageStore::new(config.state_file);
            let state = store.load().await;
            let reported = triage::report(&state, account.as_deref());
            print_report(&reported, json);
        }
        Command::MarkSurfaced => {
            let config = TriageConfig::local_only();
            let store = TriageStore::new(config.state_file);
            let count = triage::mark_surfaced(&store).await?;
            println!("Marked {count} email(s) as surfaced.");
        }
        Command::Stats { json } => {
            let config = TriageConfig::local_only();
            let store = TriageStore::new(config.state_file);
            let state = store.load().await;
            let stats = triage::stats(&state);
            print_stats(&stats, json);
        }
    }
    Ok(())
}

fn print_scan(outcome: &ScanOutcome, json: bool, verbose: bool) {
    if verbose {
        for record in &outcome.triaged {
            println!(
                "  {} [{}] {}",
                record.category.icon(),
                record.category,
                record.subject
            );
            println!("     From: {}", record.from);
            println!("     Reason: {}", record.reason);
        }
        if outcome.skipped > 0 {
            println!("  [skip] {} already-triaged message(s)", outcome.skipped);
        }
        println!(
            "\nScanned {} message(s), {} newly triaged, {} total unseen.",
            outcome.new + outcome.skipped,
            outcome.new,
            outcome.total_unseen
        );
    }
    if json {
        println!("{}", pretty(outcome));
    }
}

fn print_report(reported: &[ReportedEmail], json: bool) {
    if json {
        let body = serde_json::json!({
            "count": reported.len(),
            "emails": reported,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
        return;
    }

    if reported.is_empty() {
        println!("No important unsurfaced emails.");
        return;
    }

    println!("📬 {} email(s) needing attention:\n", reported.len());
    for e in reported {
        let record = &e.record;
        match &record.account {
            Some(account) => println!(
                "  {} [{}] {}",
                record.category.icon(),
                account,
                record.subject
            ),
            None => println!("  {} {}", record.category.icon(), record.subject),
        }
        println!("     From: {}", record.from);
        println!("     Date: {}", record.date.to_rfc3339());
        println!("     Category: {} — {}", record.category, record.reason);
        println!();
    }
}

fn print_stats(stats: &TriageStats, json: bool) {
    if json {
        println!("{}", pretty(stats));
        return;
    }

    println!("📊 Email Triage Stats");
    match stats.last_check {
        Some(t) => println!("  Last check: {}", t.to_rfc3339()),
        None => println!("  Last check: never"),
    }
    println!("  Total triaged: {}", stats.total);
    println!("\n  By category:");
    for (category, count) in &stats.categories {
        println!("    {} {}: {}", category.icon(), category, count);
    }
    println!("\n  Unsurfaced important:");
    println!("    🔴 urgent: {}", stats.unsurfaced_urgent);
    println!("    🟡 needs-response: {}", stats.unsurfaced_needs_response);
    if !stats.by_account.is_empty() {
        println!("\n  By account:");
        for (account, count) in &stats.by_account {
            println!("    {account}: {count}");
        }
    }
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
