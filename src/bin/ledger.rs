use std::error::Error;

use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::Connection;
use serde::Serialize;
use time::{Date, macros::format_description};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use budgeteur_ledger::{
    DateRange, LedgerState, TemplateKind, TransactionKind, UserID, category_breakdown,
    compute_all_balances, create_user, monthly_trends, report_summary, resolve_user, set_default,
};

/// Inspect and maintain a budgeteur ledger database.
///
/// Results are printed to stdout as JSON, logs go to stderr.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the ledger SQLite database.
    #[arg(long, env = "LEDGER_DB_PATH")]
    db_path: String,

    /// The ID of the user to act as.
    #[arg(long, env = "LEDGER_USER_ID")]
    user_id: Option<i64>,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    #[arg(long, env = "LEDGER_TIMEZONE", default_value = "Etc/UTC")]
    timezone: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new user.
    AddUser {
        /// The user's display name.
        #[arg(long)]
        name: String,
    },
    /// Show the current balance of every account.
    Balances,
    /// Show income or expense totals per category.
    Breakdown {
        /// Whether to break down incomes or expenses.
        #[arg(long, value_enum)]
        kind: KindArg,
        /// The first day to include, e.g. 2025-01-01.
        #[arg(long, value_parser = parse_date)]
        from: Date,
        /// The last day to include, e.g. 2025-01-31.
        #[arg(long, value_parser = parse_date)]
        to: Date,
    },
    /// Show totals, balances and category breakdowns for a date range.
    Summary {
        /// The first day to include, e.g. 2025-01-01.
        #[arg(long, value_parser = parse_date)]
        from: Date,
        /// The last day to include, e.g. 2025-01-31.
        #[arg(long, value_parser = parse_date)]
        to: Date,
    },
    /// Show income and expenses for each of the last few months.
    Trends {
        /// How many months to show, ending with the current month.
        #[arg(long, default_value_t = 12)]
        months: u32,
    },
    /// Change the default template of a kind.
    SetDefault {
        /// The kind of template.
        #[arg(long, value_enum)]
        kind: TemplateKindArg,
        /// The template that becomes the default.
        #[arg(long, required_unless_present = "clear", conflicts_with = "clear")]
        template_id: Option<i64>,
        /// Clear the default instead.
        #[arg(long)]
        clear: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Income,
    Expense,
}

impl From<KindArg> for TransactionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Income => TransactionKind::Income,
            KindArg::Expense => TransactionKind::Expense,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TemplateKindArg {
    Income,
    Expense,
    Transfer,
}

impl From<TemplateKindArg> for TemplateKind {
    fn from(kind: TemplateKindArg) -> Self {
        match kind {
            TemplateKindArg::Income => TemplateKind::Income,
            TemplateKindArg::Expense => TemplateKind::Expense,
            TemplateKindArg::Transfer => TemplateKind::Transfer,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    setup_logging();

    let args = Args::parse();

    let state = LedgerState::new(Connection::open(&args.db_path)?, &args.timezone)?;
    let connection = state.connection()?;

    if let Command::AddUser { name } = &args.command {
        return print_json(&create_user(name, &connection)?);
    }

    let user_id = resolve_user(args.user_id.map(UserID::new), &connection)?.id;

    match args.command {
        Command::AddUser { .. } => Ok(()),
        Command::Balances => print_json(&compute_all_balances(user_id, &connection)?),
        Command::Breakdown { kind, from, to } => print_json(&category_breakdown(
            user_id,
            kind.into(),
            DateRange::new(from, to)?,
            &connection,
        )?),
        Command::Summary { from, to } => print_json(&report_summary(
            user_id,
            DateRange::new(from, to)?,
            &connection,
        )?),
        Command::Trends { months } => {
            print_json(&monthly_trends(user_id, months, state.today()?, &connection)?)
        }
        Command::SetDefault {
            kind,
            template_id,
            clear: _,
        } => print_json(&set_default(user_id, kind.into(), template_id, &connection)?),
    }
}

fn setup_logging() {
    let stderr_log = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(stderr_log)
        .init();
}

fn parse_date(text: &str) -> Result<Date, String> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|error| format!("expected a date like 2025-01-31: {error}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
