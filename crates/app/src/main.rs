mod cli;
mod process;
mod state;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Health, Init, Serve, Version};

command_enum! {
    (Health, Health),
    (Init, Init),
    (Serve, Serve),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Resolve remote URL: explicit flag > config listen_port > 3000
    let remote = cli::op::resolve_remote(args.remote, args.config_path.clone());
    let ctx = cli::op::OpContext::new(remote, args.config_path);

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
