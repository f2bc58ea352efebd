use clap::Parser;
use simple_audit::config::AppConfig;
use simple_audit::{read_bulk, telemetry, AuditApi, AuditFramework, Error, HttpAuditApi, AUDIT};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::error;

/// Validate, and optionally submit, audit answers from a CSV file.
#[derive(Parser)]
struct Args {
    path: PathBuf,
    /// Send every valid row to the report API
    #[arg(long)]
    submit: bool,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    dataset: Option<PathBuf>,
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    let mut config = AppConfig::load()?;
    if let Some(url) = args.api_url {
        config.api.base_url = url;
        config.api.validate()?;
    }
    telemetry::init(&config.telemetry)?;

    let loaded;
    let framework: &AuditFramework = match args.dataset.or(config.dataset) {
        Some(path) => {
            loaded = AuditFramework::load(&path)?;
            &loaded
        }
        None => &*AUDIT,
    };
    let api = match args.submit {
        true => Some(HttpAuditApi::new(&config.api.base_url, config.api.timeout)?),
        false => None,
    };

    let reader = BufReader::new(File::open(&args.path)?);
    for row in read_bulk(reader, framework)? {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                error!(error = %e, "Unreadable row");
                println!("error = {}", e);
                continue;
            }
        };
        let submission = match row.submission(framework) {
            Ok(submission) => submission,
            Err(e) => {
                println!(
                    "line = {}, email = {}, answered = {}/{}, error = {}",
                    row.line,
                    row.personal.email,
                    row.answers.answered(),
                    framework.total_questions(),
                    e
                );
                continue;
            }
        };
        match &api {
            Some(api) => match api.submit(&submission) {
                Ok(report) => println!(
                    "line = {}, email = {}, overall = {:.1}, maturity = {}",
                    row.line,
                    row.personal.email,
                    report.overall_score(),
                    report.maturity_level
                ),
                Err(e) => {
                    error!(line = row.line, error = %e, "Submission failed");
                    println!("line = {}, email = {}, error = {}", row.line, row.personal.email, e);
                }
            },
            None => println!(
                "line = {}, email = {}, language = {}, ready = true",
                row.line, row.personal.email, row.language
            ),
        }
    }
    Ok(())
}
