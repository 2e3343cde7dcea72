//! Command-line interface definition.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "inbox-triage")]
#[command(version, about = "Email triage — IMAP scanner with AI classification")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan the inbox and categorize new unseen messages.
    Scan {
        /// Classify without saving state.
        #[arg(long)]
        dry_run: bool,
        /// Emit the scan summary as JSON.
        #[arg(long)]
        json: bool,
        /// Print each classified message.
        #[arg(short, long)]
        verbose: bool,
        /// Account label recorded on new triage records.
        #[arg(short, long)]
        account: Option<String>,
    },
    /// Show unsurfaced important messages.
    Report {
        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
        /// Only show records for this account.
        #[arg(short, long)]
        account: Option<String>,
    },
    /// Mark all important messages as surfaced.
    MarkSurfaced,
    /// Show triage statistics.
    Stats {
        /// Emit the statistics as JSON.
        #[arg(long)]
        json: bool,
    },
}
