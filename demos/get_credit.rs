use jimeng::JimengClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let client = JimengClient::new(None)?;

    println!("Querying account credit...");

    match client.get_credit().await {
        Ok(credit) => {
            println!("Credit: {:?} (total {})", credit, credit.total());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}
