//! Merchant Reports
//!
//! Serves the revenue-dashboard report endpoints over HTTP and offers CLI
//! commands for printing reports and maintaining payment/expense records.

mod config;
mod constants;
mod db;
mod records;
mod report;
mod routes;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use merchant_reporting::{
    DateRange, MerchantId, ReportWindow, RevenueAnalysis, aggregate_monthly_revenue,
    compute_summary,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Config, FileConfig, Overrides};
use db::SqliteStore;
use records::{Expense, Payment};
use routes::{AppState, Clock};

#[derive(Parser, Debug)]
#[command(name = "merchant-reports")]
#[command(about = "Revenue, expense and growth reports for merchants")]
struct Args {
    /// Config file (defaults are used when it does not exist)
    #[arg(short, long, default_value = constants::CONFIG_FILE, global = true)]
    config: PathBuf,

    /// SQLite database path (overrides config)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Treat this date as today when resolving report windows (YYYY-MM-DD)
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP report server
    Serve {
        /// Listen address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print summary statistics for a merchant
    Summary {
        /// Merchant ID
        #[arg(long)]
        merchant: i64,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },

    /// Print monthly revenue with month-over-month growth
    Monthly {
        /// Merchant ID
        #[arg(long)]
        merchant: i64,

        /// Number of months to include (default from config)
        #[arg(long)]
        months: Option<u32>,

        /// End the window at this date's month instead of the current one
        #[arg(long)]
        end: Option<String>,

        /// First month to show, e.g. Feb-2024
        #[arg(long)]
        from: Option<String>,

        /// Last month to show, e.g. Jun-2024
        #[arg(long)]
        to: Option<String>,
    },

    /// Manage payments
    Payment {
        #[command(subcommand)]
        action: PaymentCommand,
    },

    /// Manage expenses
    Expense {
        #[command(subcommand)]
        action: ExpenseCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PaymentCommand {
    /// List payments
    List {
        /// Only this merchant
        #[arg(long)]
        merchant: Option<i64>,
    },

    /// Add a new payment
    Add {
        /// Merchant ID
        #[arg(long)]
        merchant: i64,

        /// Amount, e.g. 19.99
        #[arg(long)]
        amount: String,

        /// Date (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS")
        #[arg(long)]
        date: String,

        /// Paying customer ID
        #[arg(long)]
        customer: Option<i64>,
    },

    /// Import payments from CSV (merchant_id,customer_id,amount,date)
    Import {
        /// Path to CSV file
        file: PathBuf,
    },

    /// Export payments to CSV
    Export {
        /// Output path
        file: PathBuf,

        /// Only this merchant
        #[arg(long)]
        merchant: Option<i64>,
    },
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    /// List expenses
    List {
        /// Only this merchant
        #[arg(long)]
        merchant: Option<i64>,
    },

    /// Add a new expense
    Add {
        /// Merchant ID
        #[arg(long)]
        merchant: i64,

        /// Amount, e.g. 250.00
        #[arg(long)]
        amount: String,

        /// Date (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS")
        #[arg(long)]
        date: String,

        /// Description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Import expenses from CSV (merchant_id,description,amount,date)
    Import {
        /// Path to CSV file
        file: PathBuf,
    },

    /// Export expenses to CSV
    Export {
        /// Output path
        file: PathBuf,

        /// Only this merchant
        #[arg(long)]
        merchant: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let file_config = FileConfig::load_or_default(&args.config)?;
    let bind = match &args.command {
        Command::Serve { bind } => bind.clone(),
        _ => None,
    };
    let config = Config::from_file(
        &file_config,
        Overrides {
            bind,
            database: args.database.clone(),
        },
    )?;

    let store = SqliteStore::open(&config.database_path).await?;
    let clock = match args.as_of {
        Some(date) => Clock::Fixed(date),
        None => Clock::System(config.zone),
    };

    match args.command {
        Command::Serve { .. } => serve(store, &config, clock).await,
        Command::Summary {
            merchant,
            start,
            end,
        } => {
            let merchant = MerchantId::new(merchant)?;
            let offset = config.zone.offset_now();
            let range = DateRange::parse_params(start.as_deref(), end.as_deref(), offset)?;
            let stats = compute_summary(&store, merchant, &range, config.customer_scope).await?;
            report::print_summary(merchant, &range, &stats);
            Ok(())
        }
        Command::Monthly {
            merchant,
            months,
            end,
            from,
            to,
        } => {
            let merchant = MerchantId::new(merchant)?;
            let offset = config.zone.offset_now();
            let anchor = DateRange::parse_params(None, end.as_deref(), offset)?;
            let window = ReportWindow::resolve(clock.today(), &anchor, months, config.limits)?;

            let mut analysis = RevenueAnalysis::new();
            let ticket = analysis.begin_request();
            let buckets =
                aggregate_monthly_revenue(&store, merchant, window.months, window.reference)
                    .await?;
            analysis.apply_response(ticket, buckets, None);

            if let Some(from) = from {
                analysis.select_start(&from)?;
            }
            if let Some(to) = to {
                analysis.select_end(&to)?;
            }

            report::print_monthly(merchant, &analysis);
            Ok(())
        }
        Command::Payment { action } => handle_payment_command(action, &store).await,
        Command::Expense { action } => handle_expense_command(action, &store).await,
    }
}

async fn serve(store: SqliteStore, config: &Config, clock: Clock) -> Result<()> {
    let mut state = AppState::new(Arc::new(store), config);
    state.clock = clock;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(
        "Serving reports on http://{} (database {})",
        listener.local_addr()?,
        config.database_path.display()
    );

    axum::serve(listener, routes::router(state))
        .await
        .context("Report server stopped unexpectedly")?;
    Ok(())
}

fn parse_merchant(merchant: Option<i64>) -> Result<Option<MerchantId>> {
    Ok(merchant.map(MerchantId::new).transpose()?)
}

fn parse_amount(raw: &str) -> Result<rust_decimal::Decimal> {
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid amount '{}': expected a decimal like 19.99", raw))
}

/// Truncate string for display
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

async fn handle_payment_command(action: PaymentCommand, store: &SqliteStore) -> Result<()> {
    match action {
        PaymentCommand::List { merchant } => {
            let payments = store.get_payments(parse_merchant(merchant)?).await?;
            if payments.is_empty() {
                println!("No payments recorded.");
                println!("\nUse 'merchant-reports payment add' to add payments");
                println!("Or 'merchant-reports payment import <file.csv>' to import from CSV");
            } else {
                println!(
                    "{:<6} {:<9} {:<9} {:<24} {:>12}",
                    "ID", "Merchant", "Customer", "Date", "Amount"
                );
                println!("{}", "-".repeat(64));

                for payment in &payments {
                    let id = payment.id.map(|i| i.to_string()).unwrap_or_default();
                    let customer = payment.customer_id.map(|c| c.to_string()).unwrap_or_default();
                    println!(
                        "{:<6} {:<9} {:<9} {:<24} {:>12}",
                        id, payment.merchant_id, customer, payment.date, payment.amount
                    );
                }
                println!("{}", "-".repeat(64));
                println!(
                    "{:>51} {:>12}",
                    "Total:",
                    records::total(payments.iter().map(|p| p.amount))?
                );
                println!("\n{} payment(s)", payments.len());
            }
            Ok(())
        }

        PaymentCommand::Add {
            merchant,
            amount,
            date,
            customer,
        } => {
            let payment = Payment {
                id: None,
                merchant_id: merchant,
                customer_id: customer,
                amount: parse_amount(&amount)?,
                date,
            };

            let id = store.add_payment(&payment).await?;
            println!(
                "Added payment #{}: merchant {} - {} on {}",
                id, payment.merchant_id, payment.amount, payment.date
            );
            Ok(())
        }

        PaymentCommand::Import { file } => {
            let payments: Vec<Payment> = records::load_from_csv(&file)?;
            let count = store.import_payments(&payments).await?;
            println!("Imported {} payments from {}", count, file.display());
            Ok(())
        }

        PaymentCommand::Export { file, merchant } => {
            let payments = store.get_payments(parse_merchant(merchant)?).await?;
            records::export_to_csv(&payments, &file)?;
            println!("Exported {} payments to {}", payments.len(), file.display());
            Ok(())
        }
    }
}

async fn handle_expense_command(action: ExpenseCommand, store: &SqliteStore) -> Result<()> {
    match action {
        ExpenseCommand::List { merchant } => {
            let expenses = store.get_expenses(parse_merchant(merchant)?).await?;
            if expenses.is_empty() {
                println!("No expenses recorded.");
                println!("\nUse 'merchant-reports expense add' to add expenses");
                println!("Or 'merchant-reports expense import <file.csv>' to import from CSV");
            } else {
                println!(
                    "{:<6} {:<9} {:<24} {:>12}  Description",
                    "ID", "Merchant", "Date", "Amount"
                );
                println!("{}", "-".repeat(80));

                for expense in &expenses {
                    let id = expense.id.map(|i| i.to_string()).unwrap_or_default();
                    println!(
                        "{:<6} {:<9} {:<24} {:>12}  {}",
                        id,
                        expense.merchant_id,
                        expense.date,
                        expense.amount,
                        truncate(&expense.description, 30),
                    );
                }
                println!("{}", "-".repeat(80));
                println!(
                    "{:>41} {:>12}",
                    "Total:",
                    records::total(expenses.iter().map(|e| e.amount))?
                );
                println!("\n{} expense(s)", expenses.len());
            }
            Ok(())
        }

        ExpenseCommand::Add {
            merchant,
            amount,
            date,
            description,
        } => {
            let expense = Expense {
                id: None,
                merchant_id: merchant,
                description,
                amount: parse_amount(&amount)?,
                date,
            };

            let id = store.add_expense(&expense).await?;
            println!(
                "Added expense #{}: merchant {} - {} on {}",
                id, expense.merchant_id, expense.amount, expense.date
            );
            Ok(())
        }

        ExpenseCommand::Import { file } => {
            let expenses: Vec<Expense> = records::load_from_csv(&file)?;
            let count = store.import_expenses(&expenses).await?;
            println!("Imported {} expenses from {}", count, file.display());
            Ok(())
        }

        ExpenseCommand::Export { file, merchant } => {
            let expenses = store.get_expenses(parse_merchant(merchant)?).await?;
            records::export_to_csv(&expenses, &file)?;
            println!("Exported {} expenses to {}", expenses.len(), file.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("rent", 10), "rent");
        assert_eq!(truncate("quarterly accounting fees", 12), "quarterly...");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 19.99 ").unwrap().to_string(), "19.99");
        assert!(parse_amount("19,99").is_err());
    }

    #[test]
    fn test_cli_parses_monthly() {
        let args = Args::try_parse_from([
            "merchant-reports",
            "monthly",
            "--merchant",
            "4",
            "--from",
            "Feb-2024",
            "--as-of",
            "2024-06-30",
        ])
        .unwrap();
        assert_eq!(args.as_of, NaiveDate::from_ymd_opt(2024, 6, 30));
        match args.command {
            Command::Monthly { merchant, from, to, .. } => {
                assert_eq!(merchant, 4);
                assert_eq!(from.as_deref(), Some("Feb-2024"));
                assert_eq!(to, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
