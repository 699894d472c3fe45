use crate::db::{LocalStore, SqliteStore};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::models::Collection;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("User:       {}", if settings.user_name.is_empty() { "(not set)" } else { &settings.user_name });
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    println!(
        "Remote:     {}",
        settings.remote_credentials().map(|(url, _)| url).unwrap_or("(local only)")
    );

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let store = SqliteStore::open(&db_path)?;
        store.init()?;
        let counts = store.counts()?;

        println!();
        if counts.is_empty() {
            println!("No records yet.");
        }
        for collection in Collection::ALL {
            let name = collection.store_name();
            let count = counts
                .iter()
                .find(|(store_name, _)| store_name == name)
                .map_or(0, |(_, n)| *n);
            println!("{:<14} {count}", format!("{name}:"));
        }
    } else {
        println!();
        println!("Database not found. Run `academy init` to set up.");
    }

    Ok(())
}
