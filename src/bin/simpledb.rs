use simpledb::config::load_config;
use simpledb::{Result, SimpleDb};
use std::process::ExitCode;
use tracing::{error, info};

const USAGE: &str = "Usage: simpledb <config.toml> <statement>...";

fn main() -> ExitCode {
    // Initialize the logging system using tracing subscriber
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    }

    match run_statements(&args[0], &args[1..]) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Runs each statement on its own session. Queries print one JSON object
/// per row; everything else prints the affected row count.
fn run_statements(config_path: &str, statements: &[String]) -> Result<()> {
    let config = load_config(config_path)?;
    info!("Starting simpledb against {}", config.database.database);
    let db = SimpleDb::open(config.database)?;

    for statement in statements {
        let mut session = db.session();
        if is_query(statement) {
            let rows = session.gen_sql()?.append(statement).select_rows()?;
            for row in rows {
                println!("{}", row.to_json());
            }
        } else {
            let changed = session.run(statement, &[])?;
            println!("{} row(s) affected", changed);
        }
    }
    Ok(())
}

fn is_query(statement: &str) -> bool {
    let head = statement.trim_start().to_uppercase();
    head.starts_with("SELECT") || head.starts_with("WITH") || head.starts_with("PRAGMA")
}
