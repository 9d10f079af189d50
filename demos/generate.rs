use jimeng::{GenerateOptions, JimengClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    // Initialize the client from environment variable
    let client = JimengClient::new(None)?;

    let prompt = "a cute puppy playing in the snow";
    println!("Submitting generation for prompt: '{}'", prompt);

    match client.generate(prompt, None, &GenerateOptions::default()).await {
        Ok(urls) => {
            println!("Generation finished with {} image(s):", urls.len());
            for url in urls {
                println!("  {}", url);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}
