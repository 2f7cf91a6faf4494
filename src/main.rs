use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = redirector::cli::Cli::parse();
    if let Err(e) = redirector::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
