use comfy_table::{Cell, Table};

use crate::cli::{open_academy, short_id};
use crate::error::Result;
use crate::fmt::money_in;
use crate::models::{new_id, Teacher};

pub async fn add(name: &str, specialty: Option<String>, salary: f64, phone: Option<String>) -> Result<()> {
    let mut academy = open_academy()?;
    academy
        .save(Teacher {
            id: new_id(),
            name: name.to_string(),
            specialty,
            salary,
            phone,
        })
        .await?;
    academy.flush().await;
    println!("Added teacher: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let academy = open_academy()?;
    let currency = &academy.state().settings.currency;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Specialty", "Salary"]);
    for t in &academy.state().teachers {
        table.add_row(vec![
            Cell::new(short_id(&t.id)),
            Cell::new(&t.name),
            Cell::new(t.specialty.clone().unwrap_or_default()),
            Cell::new(money_in(t.salary, currency)),
        ]);
    }
    println!("Teachers\n{table}");
    Ok(())
}
