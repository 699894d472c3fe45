use comfy_table::{Cell, Table};

use crate::cli::{open_academy, parse_date_opt, short_id, today, year_or_current};
use crate::error::{AcademyError, Result};
use crate::fmt::money_in;
use crate::models::Student;

pub async fn add(
    name: &str,
    enrolled: Option<&str>,
    category: &str,
    fee: Option<f64>,
    guardian: Option<String>,
    phone: Option<String>,
) -> Result<()> {
    let mut academy = open_academy()?;
    let settings = &academy.state().settings;
    if !settings.categories.iter().any(|c| c == category) {
        return Err(AcademyError::Other(format!(
            "Unknown category: {category} (known: {})",
            settings.categories.join(", ")
        )));
    }

    let mut student = Student::new(name, parse_date_opt(enrolled)?, category);
    student.monthly_fee = fee.unwrap_or(settings.default_monthly_fee);
    student.guardian = guardian;
    student.phone = phone;
    let id = student.id.clone();

    academy.save(student).await?;
    academy.flush().await;
    println!("Added student: {name} ({id})");
    Ok(())
}

pub async fn list(category: Option<&str>) -> Result<()> {
    let mut academy = open_academy()?;
    academy.refresh_paid_up(year_or_current(None), today()).await?;
    academy.flush().await;
    let currency = &academy.state().settings.currency;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Category", "Enrolled", "Fee", "Paid up"]);
    for s in academy
        .state()
        .students
        .iter()
        .filter(|s| category.map_or(true, |c| s.category == c))
    {
        table.add_row(vec![
            Cell::new(short_id(&s.id)),
            Cell::new(&s.name),
            Cell::new(&s.category),
            Cell::new(s.enrollment_date),
            Cell::new(money_in(s.monthly_fee, currency)),
            Cell::new(if s.paid_up { "yes" } else { "no" }),
        ]);
    }
    println!("Students\n{table}");
    Ok(())
}

pub async fn remove(key: &str) -> Result<()> {
    let mut academy = open_academy()?;
    let student = academy.find_student(key)?;
    let (id, name) = (student.id.clone(), student.name.clone());
    academy.remove::<Student>(&id).await?;
    academy.flush().await;
    println!("Removed student: {name}");
    Ok(())
}
