use std::path::PathBuf;

use crate::db::{LocalStore, SqliteStore};
use crate::error::Result;
use crate::settings::{load_settings, load_settings_file, save_settings, shellexpand_path};

pub fn run(
    data_dir: Option<String>,
    user: Option<String>,
    remote_url: Option<String>,
    remote_key: Option<String>,
) -> Result<()> {
    let mut settings = load_settings_file();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(user) = user {
        settings.user_name = user;
    }
    if remote_url.is_some() {
        settings.remote_url = remote_url;
    }
    if remote_key.is_some() {
        settings.remote_key = remote_key;
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(resolved.join("backups"))?;

    let store = SqliteStore::open(&settings.db_path())?;
    store.init()?;

    println!("Initialized academy at {}", resolved.display());
    if load_settings().remote_credentials().is_some() {
        println!("Remote sync: enabled");
    } else {
        println!("Remote sync: disabled (local only)");
    }
    Ok(())
}
