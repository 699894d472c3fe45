pub mod backup;
pub mod cash;
pub mod fees;
pub mod init;
pub mod report;
pub mod setup;
pub mod status;
pub mod students;
pub mod sync;
pub mod teachers;

use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};

use crate::academy::Academy;
use crate::error::{AcademyError, Result};
use crate::settings::load_settings;

pub(crate) fn open_academy() -> Result<Academy> {
    Academy::open(&load_settings())
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub(crate) fn year_or_current(year: Option<i32>) -> i32 {
    year.unwrap_or_else(|| today().year())
}

pub(crate) fn parse_date_opt(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|_| AcademyError::Other(format!("invalid date (expected YYYY-MM-DD): {d}"))),
        None => Ok(today()),
    }
}

/// First eight characters of an id, for table display.
pub(crate) fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

pub(crate) fn current_user() -> String {
    let name = load_settings().user_name;
    if name.is_empty() {
        "admin".to_string()
    } else {
        name
    }
}

#[derive(Parser)]
#[command(name = "academy", about = "Local-first bookkeeping for a sports academy.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up academy: choose a data directory and initialize the database.
    Init {
        /// Path for academy data (default: ~/Documents/academy)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Name recorded on cash entries
        #[arg(long)]
        user: Option<String>,
        /// Remote backend base URL
        #[arg(long = "remote-url")]
        remote_url: Option<String>,
        /// Remote backend API key
        #[arg(long = "remote-key")]
        remote_key: Option<String>,
    },
    /// Configure academy-wide settings (name, categories, default fee).
    Setup {
        #[arg(long)]
        name: Option<String>,
        /// Default monthly fee for students without their own
        #[arg(long = "default-fee")]
        default_fee: Option<f64>,
        #[arg(long)]
        currency: Option<String>,
        /// Replace the category list (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
    },
    /// Manage students.
    Students {
        #[command(subcommand)]
        command: StudentsCommands,
    },
    /// Manage teachers.
    Teachers {
        #[command(subcommand)]
        command: TeachersCommands,
    },
    /// Record a monthly student fee.
    Pay {
        /// Student id or name
        student: String,
        /// Month: 1-12 or Spanish name
        #[arg(long)]
        month: String,
        #[arg(long)]
        year: Option<i32>,
        /// Amount (default: the student's monthly fee)
        #[arg(long)]
        amount: Option<f64>,
        /// Payment date YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Pay a teacher's salary.
    Payroll {
        /// Teacher id or name
        teacher: String,
        /// Amount (default: the teacher's salary)
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Cash-on-hand ledger.
    Cash {
        #[command(subcommand)]
        command: CashCommands,
    },
    /// Debt reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Synchronize with the remote backend.
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Export or restore the whole academy state.
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum StudentsCommands {
    /// Enroll a student.
    Add {
        name: String,
        /// Enrollment date YYYY-MM-DD (default: today)
        #[arg(long)]
        enrolled: Option<String>,
        #[arg(long)]
        category: String,
        /// Monthly fee
        #[arg(long)]
        fee: Option<f64>,
        #[arg(long)]
        guardian: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// List students.
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Remove a student by id or name.
    Remove { student: String },
}

#[derive(Subcommand)]
pub enum TeachersCommands {
    /// Add a teacher.
    Add {
        name: String,
        #[arg(long)]
        specialty: Option<String>,
        #[arg(long, default_value = "0")]
        salary: f64,
        #[arg(long)]
        phone: Option<String>,
    },
    /// List teachers.
    List,
}

#[derive(Subcommand)]
pub enum CashCommands {
    /// Record cash received.
    In {
        amount: f64,
        description: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Record cash paid out.
    Out {
        amount: f64,
        description: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Show the cash ledger and balance.
    Balance,
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Month-by-month status of one student.
    Student {
        /// Student id or name
        student: String,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Students owing fees, most months first.
    Debts {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        year: Option<i32>,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Replace local data with the remote copy.
    Download,
    /// Push all local data to the remote backend.
    Upload,
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Write every collection to a JSON file.
    Export {
        /// Output path (default: <data_dir>/backups/academy-YYYYMMDD-HHMMSS.json)
        #[arg(long)]
        output: Option<String>,
    },
    /// Restore the collections present in a JSON export.
    Import { file: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_date_opt() {
        assert_eq!(
            parse_date_opt(Some("2024-02-01")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
        assert!(parse_date_opt(Some("01/02/2024")).is_err());
        assert_eq!(parse_date_opt(None).unwrap(), today());
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0f8c2a7e-1b2c-4d5e"), "0f8c2a7e");
        assert_eq!(short_id("t1"), "t1");
        assert_eq!(short_id("aáááá-1-ñandú"), "aáááá-1-");
    }

    #[test]
    fn test_pay_parses_month_and_year() {
        let cli = Cli::try_parse_from(["academy", "pay", "Ana", "--month", "febrero", "--year", "2024"])
            .unwrap();
        match cli.command {
            Commands::Pay { student, month, year, .. } => {
                assert_eq!(student, "Ana");
                assert_eq!(month, "febrero");
                assert_eq!(year, Some(2024));
            }
            _ => panic!("expected pay"),
        }
    }
}
