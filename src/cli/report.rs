use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_academy, today, year_or_current};
use crate::error::Result;
use crate::fmt::money_in;
use crate::ledger;

pub fn student(key: &str, year: Option<i32>) -> Result<()> {
    let academy = open_academy()?;
    let year = year_or_current(year);
    let student = academy.find_student(key)?;
    let statuses = ledger::monthly_status(Some(student), year, &academy.state().payments, today());

    let mut table = Table::new();
    table.set_header(vec!["Month", "Status"]);
    for s in &statuses {
        let status = if s.is_before_enrollment {
            "not enrolled".dimmed()
        } else if s.is_paid {
            "paid".green()
        } else if s.is_future {
            "not due".dimmed()
        } else {
            "OWED".red().bold()
        };
        table.add_row(vec![Cell::new(s.month_name()), Cell::new(status)]);
    }

    let owed = ledger::months_owed(&statuses);
    println!("{} - {} ({year})\n{table}", student.name, student.category);
    let currency = &academy.state().settings.currency;
    println!(
        "Months owed: {owed} ({})",
        money_in(owed as f64 * student.monthly_fee, currency)
    );
    Ok(())
}

pub async fn debts(category: Option<&str>, year: Option<i32>) -> Result<()> {
    let mut academy = open_academy()?;
    academy.refresh_paid_up(year_or_current(None), today()).await?;
    academy.flush().await;
    let year = year_or_current(year);
    let debts = academy.debts(category, year, today());
    let currency = &academy.state().settings.currency;

    if debts.is_empty() {
        println!("No pending fees for {year}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Student", "Category", "Months", "Pending", "Due"]);
    for d in &debts {
        table.add_row(vec![
            Cell::new(&d.name),
            Cell::new(&d.category),
            Cell::new(d.months_owed),
            Cell::new(d.pending_summary()),
            Cell::new(money_in(d.amount_due, currency)),
        ]);
    }
    let total: f64 = debts.iter().map(|d| d.amount_due).sum();
    table.add_row(vec![
        Cell::new("TOTAL".red().bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(money_in(total, currency)),
    ]);
    println!("Pending fees {year}\n{table}");
    Ok(())
}
