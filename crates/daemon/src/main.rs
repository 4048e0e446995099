// CLI modules
mod cli;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Book, Daemon, Health, Init, Keys, Version};

command_enum! {
    (Book, Book),
    (Daemon, Daemon),
    (Health, Health),
    (Init, Init),
    (Keys, Keys),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match run(args).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> anyhow::Result<OpOutput> {
    // explicit flag > config api_port > default 3000
    let remote = cli::op::resolve_remote(args.remote, args.config_path.clone());

    let ctx = cli::op::OpContext::new(remote, args.config_path)
        .context("failed to create API client")?;

    Ok(args.command.execute(&ctx).await?)
}
