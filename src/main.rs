use clap::Parser;
use page_mirror::Mirror;

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    println!("Note: rendering requires a WebDriver server (e.g., ChromeDriver).");
    println!(
        "Set WEBDRIVER_URL or --webdriver-url if not using {}",
        config.webdriver_url
    );

    let output_dir = config.output_dir.clone();
    let start_time = std::time::Instant::now();

    match Mirror::with_config(config).run().await {
        Ok(summary) => {
            println!();
            println!("{}", summary);
            println!(
                "Files saved to {} in {:.2} seconds",
                output_dir.display(),
                start_time.elapsed().as_secs_f64()
            );
        }
        Err(e) => {
            ::log::error!("Mirror failed: {}", e);
            if e.is_navigation() {
                eprintln!("Could not render the start page: {}", e);
            } else {
                eprintln!("Mirror failed: {}", e);
            }
            std::process::exit(1);
        }
    }
}
