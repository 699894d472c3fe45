use crate::cli::{current_user, open_academy, parse_date_opt, today, year_or_current};
use crate::error::{AcademyError, Result};
use crate::fmt::{money_in, parse_month};

pub async fn pay(
    student: &str,
    month: &str,
    year: Option<i32>,
    amount: Option<f64>,
    date: Option<&str>,
) -> Result<()> {
    let month_index =
        parse_month(month).ok_or_else(|| AcademyError::Other(format!("invalid month: {month}")))?;
    let date = parse_date_opt(date)?;
    let mut academy = open_academy()?;
    let payment = academy
        .record_fee(student, month_index, year_or_current(year), amount, date, &current_user())
        .await?;
    academy.flush().await;
    academy.refresh_paid_up(year_or_current(None), today()).await?;
    academy.flush().await;

    let currency = &academy.state().settings.currency;
    println!("{} - {}", payment.description, money_in(payment.amount, currency));
    Ok(())
}

pub async fn payroll(teacher: &str, amount: Option<f64>, date: Option<&str>) -> Result<()> {
    let date = parse_date_opt(date)?;
    let mut academy = open_academy()?;
    let payment = academy.pay_teacher(teacher, amount, date, &current_user()).await?;
    academy.flush().await;

    let currency = &academy.state().settings.currency;
    println!("{} - {}", payment.description, money_in(payment.amount, currency));
    Ok(())
}
