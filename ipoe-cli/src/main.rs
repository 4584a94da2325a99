use ipoe_cli::{logging, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();
    logging::init(cli.verbose);

    ipoe_cli::run(cli).await?;
    Ok(())
}
