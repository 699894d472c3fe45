use crate::cli::open_academy;
use crate::error::Result;
use crate::fmt::money_in;

pub async fn run(
    name: Option<String>,
    default_fee: Option<f64>,
    currency: Option<String>,
    categories: Vec<String>,
) -> Result<()> {
    let mut academy = open_academy()?;
    let mut settings = academy.state().settings.clone();

    if let Some(name) = name {
        settings.academy_name = name;
    }
    if let Some(fee) = default_fee {
        settings.default_monthly_fee = fee;
    }
    if let Some(currency) = currency {
        settings.currency = currency;
    }
    if !categories.is_empty() {
        settings.categories = categories;
    }

    academy.update_settings(settings.clone()).await?;
    academy.flush().await;

    println!("Academy:      {}", if settings.academy_name.is_empty() { "(not set)" } else { &settings.academy_name });
    println!("Default fee:  {}", money_in(settings.default_monthly_fee, &settings.currency));
    println!("Categories:   {}", settings.categories.join(", "));
    Ok(())
}
