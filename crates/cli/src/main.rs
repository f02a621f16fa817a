//! Waitline CLI - pull-only view of the clinic queue

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use waitline_core::application::formatters::{
    clinic_status, format_phone_display, mask_phone, position_message, to_title_case,
    DEFAULT_COUNTRY_CODE,
};
use waitline_core::application::projector::{by_service_date, project, track};
use waitline_core::application::{Locale, QueueView, TrackingLookup};
use waitline_core::domain::{
    civil_offset, EntryStatus, QueueEntry, QueueSnapshot, ServiceDate, TokenNumber,
    DEFAULT_UTC_OFFSET_MINUTES,
};
use waitline_core::port::time_provider::SystemTimeProvider;
use waitline_core::port::{QueueApi, TimeProvider};
use waitline_infra_feed::http_api::DEFAULT_REQUEST_TIMEOUT;
use waitline_infra_feed::HttpQueueApi;

const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

#[derive(Parser)]
#[command(name = "waitline")]
#[command(about = "Waitline clinic queue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Queue service URL
    #[arg(long, env = "WAITLINE_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    /// Clinic offset from UTC, in minutes (330 = +05:30)
    #[arg(
        long,
        env = "WAITLINE_UTC_OFFSET_MINUTES",
        default_value_t = DEFAULT_UTC_OFFSET_MINUTES,
        allow_hyphen_values = true
    )]
    utc_offset_minutes: i32,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current patient and who is next
    Status {
        /// Only entries created on this service date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "today")]
        date: Option<ServiceDate>,

        /// Only entries created today at the clinic offset
        #[arg(long)]
        today: bool,

        /// Number of waiting patients to list
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,

        /// Print the projection as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up one patient by token number
    Track {
        token: TokenNumber,

        /// Language of the queue status line (te-IN or en-IN)
        #[arg(long, default_value = "te-IN")]
        locale: Locale,
    },

    /// Patients served today
    Served,

    /// Print the announcement for a token without speaking it
    Preview {
        token: TokenNumber,

        name: String,

        /// te-IN or en-IN
        #[arg(long, default_value = "te-IN")]
        locale: Locale,
    },
}

#[derive(Tabled)]
struct UpcomingRow {
    #[tabled(rename = "Token")]
    token: TokenNumber,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    entry_type: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "Est. wait (min)")]
    wait: u32,
}

impl From<&QueueEntry> for UpcomingRow {
    fn from(entry: &QueueEntry) -> Self {
        Self {
            token: entry.token_number,
            name: to_title_case(&entry.name),
            entry_type: entry.entry_type.to_string(),
            phone: mask_phone(&entry.phone),
            wait: entry.estimated_wait_time,
        }
    }
}

#[derive(Serialize)]
struct StatusReport<'a> {
    date: Option<String>,
    clinic_status: String,
    view: &'a QueueView,
}

fn filter_snapshot(
    snapshot: QueueSnapshot,
    date: Option<ServiceDate>,
    offset: chrono::FixedOffset,
) -> QueueSnapshot {
    match date {
        Some(date) => by_service_date(&snapshot, date, offset),
        None => snapshot,
    }
}

fn print_status(view: &QueueView, date: Option<ServiceDate>) {
    let heading = match date {
        Some(date) => format!("Queue for {}", date),
        None => "Queue".to_string(),
    };
    println!("{}", heading.cyan().bold());
    println!();

    match &view.current {
        Some(current) => println!(
            "  {} #{} {}",
            "Now serving:".bold(),
            current.token_number.to_string().green().bold(),
            to_title_case(&current.name)
        ),
        None => println!("  {} {}", "Now serving:".bold(), "nobody".yellow()),
    }
    println!("  {} {}", "Waiting:".bold(), view.waiting_count);
    println!("  {} {}", "Served:".bold(), view.served_count);
    println!("  {} {}", "Total:".bold(), view.total_count);
    println!(
        "  {} {}",
        "Status:".bold(),
        clinic_status(view.waiting_count, false)
    );
    println!();

    if view.upcoming.is_empty() {
        println!("{}", "No one is waiting".yellow());
    } else {
        let rows: Vec<UpcomingRow> = view.upcoming.iter().map(UpcomingRow::from).collect();
        println!("{}", Table::new(rows));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let offset = civil_offset(cli.utc_offset_minutes).context("Invalid --utc-offset-minutes")?;
    let api = HttpQueueApi::new(cli.server_url.as_str(), DEFAULT_REQUEST_TIMEOUT)
        .context("Failed to create HTTP client")?;

    match cli.command {
        Commands::Status {
            date,
            today,
            limit,
            json,
        } => {
            let date = if today {
                Some(ServiceDate::from_instant(SystemTimeProvider.now_utc(), offset))
            } else {
                date
            };

            let snapshot = api
                .fetch_queue()
                .await
                .context("Failed to fetch queue")?;
            let view = project(&filter_snapshot(snapshot, date, offset), limit);

            if json {
                let report = StatusReport {
                    date: date.map(|d| d.key()),
                    clinic_status: clinic_status(view.waiting_count, false).to_string(),
                    view: &view,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_status(&view, date);
            }
        }

        Commands::Track { token, locale } => {
            let snapshot = api
                .fetch_queue()
                .await
                .context("Failed to fetch queue")?;

            match track(&snapshot, token) {
                TrackingLookup::Found(entry) => {
                    println!(
                        "{} #{} {}",
                        "Token".cyan().bold(),
                        entry.token_number,
                        to_title_case(&entry.name)
                    );
                    println!("  {} {}", "Status:".bold(), entry.status);
                    println!(
                        "  {} {}",
                        "Phone:".bold(),
                        format_phone_display(&entry.phone, DEFAULT_COUNTRY_CODE)
                    );
                    println!("  {}", position_message(&entry).green());
                    if let Some(line) = queue_status_line(&entry, locale) {
                        println!("  {} {}", "Announcement:".bold(), line);
                    }
                }
                TrackingLookup::NotFound(token) => {
                    println!("{}", format!("✗ Token {} is not in the queue", token).red());
                }
            }
        }

        Commands::Served => {
            let count = api
                .served_today()
                .await
                .context("Failed to fetch served-today count")?;
            println!("{} {}", "Served today:".bold(), count.to_string().green().bold());
        }

        Commands::Preview {
            token,
            name,
            locale,
        } => {
            println!("{}", locale.announcement_text(token, &name));
        }
    }

    Ok(())
}

/// Spoken status for a patient still waiting with a known position
fn queue_status_line(entry: &QueueEntry, locale: Locale) -> Option<String> {
    (entry.status == EntryStatus::Waiting && entry.position > 0)
        .then(|| locale.queue_status_text(entry.position, entry.estimated_wait_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use waitline_core::domain::EntryType;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_status_for_date() {
        let cli = Cli::try_parse_from(["waitline", "status", "--date", "2024-03-02", "-n", "3"])
            .unwrap();
        match cli.command {
            Commands::Status { date, limit, .. } => {
                assert_eq!(date.unwrap().key(), "2024-03-02");
                assert_eq!(limit, 3);
            }
            _ => panic!("expected status"),
        }
        assert!(Cli::try_parse_from(["waitline", "status", "--date", "2024-03-02", "--today"])
            .is_err());
    }

    #[test]
    fn test_track_status_line() {
        let cli = Cli::try_parse_from(["waitline", "track", "9", "--locale", "en-IN"]).unwrap();
        let locale = match cli.command {
            Commands::Track { token, locale } => {
                assert_eq!(token, 9);
                locale
            }
            _ => panic!("expected track"),
        };

        let mut waiting = QueueEntry::new("b", 9, "Sita", EntryType::WalkIn)
            .with_status(EntryStatus::Waiting)
            .with_position(2);
        waiting.estimated_wait_time = 30;
        assert_eq!(
            queue_status_line(&waiting, locale).unwrap(),
            "You are at position 2. Estimated wait time is 30 minutes."
        );

        let serving = waiting.clone().with_status(EntryStatus::InProgress);
        assert!(queue_status_line(&serving, locale).is_none());
    }

    #[test]
    fn test_negative_offset_accepted() {
        let cli =
            Cli::try_parse_from(["waitline", "--utc-offset-minutes", "-300", "served"]).unwrap();
        assert_eq!(cli.utc_offset_minutes, -300);
    }

    #[test]
    fn test_upcoming_row_masks_phone() {
        let entry = QueueEntry::new("a", 4, "ravi kumar", EntryType::Booked)
            .with_phone("9876543210")
            .with_status(EntryStatus::Waiting);
        let row = UpcomingRow::from(&entry);
        assert_eq!(row.name, "Ravi Kumar");
        assert_eq!(row.phone, "98XXXXXX10");
        assert_eq!(row.entry_type, "BOOKED");
    }
}
