use tcg_hub::config::database_url;
use tcg_hub::db::{connect, get_all_tournaments, get_logo, get_popup};
use tcg_hub::env::load_environment;
use tcg_hub::models::{DATE_FORMAT, TIME_FORMAT};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_environment()?;

    let url = database_url();
    let pool = connect(&url).await?;
    let tournaments = get_all_tournaments(&pool).await?;

    println!("Database: {}", url);
    println!("Tournaments stored: {}", tournaments.len());

    for t in &tournaments {
        println!(
            "  [{:>3}] {} | {} | {} {} | {}",
            t.id,
            t.store_name,
            t.location,
            t.date.format(DATE_FORMAT),
            t.time.format(TIME_FORMAT),
            t.game
        );
    }

    match get_logo(&pool).await? {
        Some(logo) => println!("Logo: {}", logo.filename),
        None => println!("Logo: none"),
    }

    match get_popup(&pool).await? {
        Some(popup) => println!(
            "Popup: {} ({})",
            popup.filename,
            if popup.active { "active" } else { "inactive" }
        ),
        None => println!("Popup: none"),
    }

    Ok(())
}
