use chrono::NaiveDate;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bibliocore::domain::DomainError;
use bibliocore::infrastructure::AppState;
use bibliocore::services::{capacity_ledger, loan_service};
use bibliocore::{config, db, seed};

const USAGE: &str = "usage: bibliocore [--profile NAME] <init | seed | sweep [YYYY-MM-DD] | audit>";

enum Command {
    Init,
    Seed,
    Sweep(Option<NaiveDate>),
    Audit,
}

/// Split `--profile NAME` from the positional arguments and parse the command
fn parse_args(args: &[String]) -> Result<(Option<String>, Command), String> {
    let mut profile = None;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--profile" {
            let val = iter.next().ok_or("--profile needs a value")?;
            profile = Some(val.clone());
        } else {
            positional.push(arg.as_str());
        }
    }

    let command = match positional.as_slice() {
        ["init"] => Command::Init,
        ["seed"] => Command::Seed,
        ["sweep"] => Command::Sweep(None),
        ["sweep", date] => {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| format!("invalid date '{date}': {e}"))?;
            Command::Sweep(Some(date))
        }
        ["audit"] => Command::Audit,
        _ => return Err(USAGE.to_string()),
    };

    Ok((profile, command))
}

async fn run(config: config::Config, command: Command) -> Result<(), DomainError> {
    let state = AppState::new(db::init_db_with(&config).await?, config.loan_policy.clone());
    let db = state.db();

    match command {
        Command::Init => {
            tracing::info!("Database ready at {}", config.database_url);
        }
        Command::Seed => {
            if seed::seed_demo_data(db).await? {
                tracing::info!("Demo data seeded successfully.");
            }
        }
        Command::Sweep(as_of) => {
            let as_of = as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
            let marked = loan_service::sweep_overdue(db, as_of).await?;
            let late = state.loan_repo.find_late(as_of).await?;
            println!("{marked} loan(s) marked overdue, {} open loan(s) past due", late.len());
        }
        Command::Audit => {
            let audits = capacity_ledger::audit_all(db).await?;
            let drifted = audits.iter().filter(|a| !a.is_consistent()).count();
            let json = serde_json::to_string_pretty(&audits)
                .map_err(|e| DomainError::Validation(e.to_string()))?;
            println!("{json}");
            if drifted > 0 {
                tracing::warn!("{} shelf counter(s) out of sync", drifted);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bibliocore=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (profile, command) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let config = match profile {
        Some(profile) => config::Config::for_profile(profile),
        None => config::Config::from_env(),
    };

    if let Err(e) = run(config, command).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
