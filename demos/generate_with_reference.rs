use jimeng::{GenerateOptions, ImageInput, JimengClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let image = std::env::args()
        .nth(1)
        .expect("usage: generate_with_reference <image path or URL>");

    let client = JimengClient::new(None)?;

    let prompt = "the same subject, as a watercolor painting";
    println!("Submitting blend generation for: '{}'", prompt);

    match client
        .generate(prompt, Some(ImageInput::parse(&image)), &GenerateOptions::default())
        .await
    {
        Ok(urls) => {
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
