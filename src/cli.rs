//! src/cli.rs
use clap::Parser;

/// Turn yesterday's commits and open tickets into a daily standup update.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Reset the configuration and run the setup wizard again
    #[arg(short, long)]
    pub setup: bool,

    /// Add a project to the configuration
    #[arg(short, long)]
    pub add_project: bool,

    /// List configured projects
    #[arg(short, long)]
    pub list_projects: bool,

    /// Show active tickets for every project with a tracker, without the AI summary
    #[arg(short = 't', long)]
    pub fetch_tickets: bool,

    /// Switch the LLM provider (also accepted as `-llm`)
    #[arg(long)]
    pub switch_llm: bool,

    /// Blockers to report, skipping the prompt. A bare flag means "None"
    #[arg(short, long, num_args = 0..=1, default_missing_value = "None")]
    pub blocker: Option<String>,

    /// Only include commits from this day (YYYY-MM-DD)
    #[arg(short, long)]
    pub date: Option<String>,
}

impl Cli {
    /// Parses the process arguments, accepting `-llm` as `--switch-llm`.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args()))
    }
}

fn normalize_args<I: IntoIterator<Item = String>>(args: I) -> Vec<String> {
    args.into_iter()
        .map(|arg| {
            if arg == "-llm" {
                "--switch-llm".to_string()
            } else {
                arg
            }
        })
        .collect()
}
