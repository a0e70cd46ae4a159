//! src/main.rs

use anyhow::Result;
use colored::Colorize;

mod aggregate;
mod cli;
mod commands;
mod config;
mod errors;
mod git;
mod http;
mod llm;
mod prompt;
mod session;
mod tickets;

use cli::Cli;
use commands::{projects, setup, standup, tickets as ticket_cmd};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let cli = Cli::parse_args();
    if let Err(e) = run(cli).await {
        log::debug!("fatal: {e:?}");
        eprintln!("{} {e:#}", "❌".red());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.setup {
        setup::handle_setup().await
    } else if cli.add_project {
        setup::handle_add_project().await
    } else if cli.list_projects {
        projects::handle_list_projects().await
    } else if cli.switch_llm {
        setup::handle_switch_llm().await
    } else if cli.fetch_tickets {
        ticket_cmd::handle_fetch_tickets().await
    } else {
        standup::handle_standup(cli.blocker, cli.date).await
    }
}
