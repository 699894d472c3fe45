use std::path::PathBuf;

use crate::backup::{default_export_path, export_to, import_from};
use crate::cli::open_academy;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::get_data_dir;

pub fn export(output: Option<String>) -> Result<()> {
    let academy = open_academy()?;
    let dest_path = match output {
        Some(p) => PathBuf::from(p),
        None => default_export_path(&get_data_dir()),
    };
    let size = export_to(&academy, &dest_path)?;
    println!("Backup saved to {}", dest_path.display());
    println!("Size: {}", format_bytes(size));
    Ok(())
}

pub async fn import(file: &str) -> Result<()> {
    let mut academy = open_academy()?;
    let applied = import_from(&mut academy, &PathBuf::from(file)).await?;
    academy.flush().await;
    let names: Vec<&str> = applied.iter().map(|c| c.store_name()).collect();
    println!("Restored: {}", names.join(", "));
    Ok(())
}
