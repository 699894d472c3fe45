use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{current_user, open_academy, parse_date_opt};
use crate::error::Result;
use crate::fmt::money_in;
use crate::models::Direction;

pub async fn record(direction: Direction, amount: f64, description: &str, date: Option<&str>) -> Result<()> {
    let date = parse_date_opt(date)?;
    let mut academy = open_academy()?;
    academy
        .record_cash(direction, amount, description, date, &current_user())
        .await?;
    academy.flush().await;

    let currency = &academy.state().settings.currency;
    println!("Recorded: {description} {}", money_in(amount, currency));
    println!("Balance:  {}", money_in(academy.cash_balance(), currency));
    Ok(())
}

pub fn balance() -> Result<()> {
    let academy = open_academy()?;
    let currency = &academy.state().settings.currency;

    let mut entries: Vec<_> = academy.state().cash_flow.iter().collect();
    entries.sort_by_key(|c| c.date);

    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "By", "Amount"]);
    for c in entries {
        let amount = money_in(c.signed_amount(), currency);
        let amount = match c.direction {
            Direction::Income => amount.green(),
            Direction::Outcome => amount.red(),
        };
        table.add_row(vec![
            Cell::new(c.date),
            Cell::new(&c.description),
            Cell::new(&c.recorded_by),
            Cell::new(amount),
        ]);
    }

    let balance = academy.cash_balance();
    let label = if balance >= 0.0 { "BALANCE".green().bold() } else { "BALANCE".red().bold() };
    table.add_row(vec![Cell::new(label), Cell::new(""), Cell::new(""), Cell::new(money_in(balance, currency))]);
    println!("Cash\n{table}");
    Ok(())
}
