use anyhow::Result;
use colored::Colorize;

use crate::config;
use crate::http;
use crate::tickets::{HttpTrackers, TicketSource};

/// Lists active tickets per project without calling the LLM.
pub async fn handle_fetch_tickets() -> Result<()> {
    let config = config::load_config().await?;
    let trackers = HttpTrackers::new(http::build_client()?);

    let mut any_tracker = false;
    for project in &config.projects {
        let Some(tracker) = config.tracker_for(project) else {
            continue;
        };
        any_tracker = true;
        println!(
            "\n{} {}",
            "📌".cyan(),
            format!("{} ({})", project.name, tracker.kind()).bold()
        );
        match trackers.list_active(&tracker, tracker.assignee()).await {
            Ok(tickets) if tickets.is_empty() => println!("  No active tickets."),
            Ok(tickets) => {
                for ticket in tickets {
                    let r = ticket.record;
                    println!("  {} [{}][{}]", r.key, r.status, r.priority);
                    println!("    {}", r.title);
                    println!("    {}", r.description.dimmed());
                    println!("    Type: {}", r.issue_type);
                }
            }
            Err(e) => println!(
                "{}",
                format!("⚠️  Could not list active tickets: {e}").yellow()
            ),
        }
    }

    if !any_tracker {
        println!(
            "{}",
            "No project has an issue tracker configured. Run `standupmate --setup` or `--add-project`."
                .yellow()
        );
    }
    Ok(())
}
