mod academy;
mod backup;
mod cli;
mod db;
mod error;
mod fmt;
mod ledger;
mod models;
mod remote;
mod settings;
mod sync;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{BackupCommands, CashCommands, Cli, Commands, ReportCommands, StudentsCommands, SyncCommands, TeachersCommands};
use models::Direction;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("academy=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            user,
            remote_url,
            remote_key,
        } => cli::init::run(data_dir, user, remote_url, remote_key),
        Commands::Setup {
            name,
            default_fee,
            currency,
            categories,
        } => cli::setup::run(name, default_fee, currency, categories).await,
        Commands::Students { command } => match command {
            StudentsCommands::Add {
                name,
                enrolled,
                category,
                fee,
                guardian,
                phone,
            } => cli::students::add(&name, enrolled.as_deref(), &category, fee, guardian, phone).await,
            StudentsCommands::List { category } => cli::students::list(category.as_deref()).await,
            StudentsCommands::Remove { student } => cli::students::remove(&student).await,
        },
        Commands::Teachers { command } => match command {
            TeachersCommands::Add {
                name,
                specialty,
                salary,
                phone,
            } => cli::teachers::add(&name, specialty, salary, phone).await,
            TeachersCommands::List => cli::teachers::list(),
        },
        Commands::Pay {
            student,
            month,
            year,
            amount,
            date,
        } => cli::fees::pay(&student, &month, year, amount, date.as_deref()).await,
        Commands::Payroll { teacher, amount, date } => {
            cli::fees::payroll(&teacher, amount, date.as_deref()).await
        }
        Commands::Cash { command } => match command {
            CashCommands::In {
                amount,
                description,
                date,
            } => cli::cash::record(Direction::Income, amount, &description, date.as_deref()).await,
            CashCommands::Out {
                amount,
                description,
                date,
            } => cli::cash::record(Direction::Outcome, amount, &description, date.as_deref()).await,
            CashCommands::Balance => cli::cash::balance(),
        },
        Commands::Report { command } => match command {
            ReportCommands::Student { student, year } => cli::report::student(&student, year),
            ReportCommands::Debts { category, year } => {
                cli::report::debts(category.as_deref(), year).await
            }
        },
        Commands::Sync { command } => match command {
            SyncCommands::Download => cli::sync::download().await,
            SyncCommands::Upload => cli::sync::upload().await,
        },
        Commands::Backup { command } => match command {
            BackupCommands::Export { output } => cli::backup::export(output),
            BackupCommands::Import { file } => cli::backup::import(&file).await,
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
