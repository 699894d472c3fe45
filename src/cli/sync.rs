use crate::cli::open_academy;
use crate::error::{AcademyError, Result};

pub async fn download() -> Result<()> {
    let mut academy = open_academy()?;
    if !academy.sync().remote_enabled() {
        return Err(AcademyError::RemoteDisabled);
    }
    let applied = academy.download_all().await?;
    if applied.is_empty() {
        println!("Remote returned no data; local collections left unchanged.");
    }
    for (collection, count) in applied {
        println!("Downloaded {count} {}", collection.store_name());
    }
    Ok(())
}

pub async fn upload() -> Result<()> {
    let academy = open_academy()?;
    if !academy.sync().remote_enabled() {
        return Err(AcademyError::RemoteDisabled);
    }
    for (collection, count) in academy.upload_all().await? {
        println!("Uploaded {count} {}", collection.store_name());
    }
    Ok(())
}
