use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::aggregate::{aggregate_projects, Aggregate};
use crate::commands::setup::run_setup_wizard;
use crate::config;
use crate::git::{self, GitLog, ScanWindow};
use crate::http;
use crate::llm::{create_llm_client, run_ladder, Ladder};
use crate::prompt;
use crate::session::Session;
use crate::tickets::HttpTrackers;

const NO_BLOCKERS: &str = "None";

pub async fn handle_standup(blocker: Option<String>, date: Option<String>) -> Result<()> {
    let window = match date.as_deref() {
        Some(raw) => ScanWindow::parse_date(raw)?,
        None => ScanWindow::Recent,
    };
    git::ensure_git_available()?;

    if !config::config_exists().await? {
        println!("{}", "No configuration found, starting setup.".yellow());
        run_setup_wizard().await?;
    }
    let config = config::load_config().await?;
    let patterns = config.ticket_patterns()?;
    let http = http::build_client()?;
    let llm_client = create_llm_client(&config, http.clone())?;

    if config.projects.is_empty() {
        println!(
            "{}",
            "⚠️  No projects configured. Add one with `standupmate --add-project`.".yellow()
        );
    }

    println!(
        "🔍 Collecting commits from {} project(s) for {}...",
        config.projects.len(),
        window.describe()
    );
    let trackers = HttpTrackers::new(http);
    let aggregate = aggregate_projects(&config, &patterns, window, &GitLog, &trackers).await;

    if aggregate.total_commits == 0 {
        println!(
            "{}",
            format!("No commits found for {}. Nothing to report.", window.describe()).yellow()
        );
        return Ok(());
    }
    print_activity(&aggregate);

    let blockers = match blocker {
        Some(text) if !text.trim().is_empty() => text.trim().to_string(),
        Some(_) => NO_BLOCKERS.to_string(),
        None => ask_blockers()?,
    };

    let template = prompt::load_template().await;
    let rendered = prompt::render(&template, &aggregate.bundles, &blockers);
    log::debug!("rendered prompt:\n{rendered}");

    let ladder = Ladder::from_config(&config);
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message(format!("🤖 Asking {} for your standup...", ladder.provider));
    spinner.enable_steady_tick(Duration::from_millis(120));
    let result = run_ladder(llm_client.as_client(), &ladder, &rendered).await;
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            println!("\n{}", "=".repeat(60));
            println!("{}", format!("🤖 Standup ({})", ladder.provider).green().bold());
            println!("{}\n", "=".repeat(60));
            println!("{summary}");
        }
        Err(e) => {
            log::warn!("standup generation failed: {e}");
            println!(
                "{}",
                format!("⚠️  Could not generate the AI standup: {e}").yellow()
            );
            println!("Your commits are listed above.");
        }
    }
    Ok(())
}

fn ask_blockers() -> Result<String> {
    let mut session = Session::open();
    let answer = session.input("Any blockers? (leave empty for none)", None)?;
    Ok(if answer.is_empty() {
        NO_BLOCKERS.to_string()
    } else {
        answer
    })
}

fn print_activity(aggregate: &Aggregate) {
    for bundle in &aggregate.bundles {
        println!(
            "\n{} {}",
            "📁".cyan(),
            format!("{} ({})", bundle.project_name, commits_label(bundle.commit_details.len())).bold()
        );
        for detail in &bundle.commit_details {
            println!("  - {}", detail.display_line());
        }
        if !bundle.active_tickets.is_empty() {
            println!("  {}", "📌 Active tickets:".cyan());
            for ticket in &bundle.active_tickets {
                let r = &ticket.record;
                println!("    {} [{}][{}] {}", r.key, r.status, r.priority, r.title);
            }
        }
    }
    println!(
        "\n{}",
        format!(
            "✅ Found {} across {} project(s).",
            commits_label(aggregate.total_commits),
            aggregate.bundles.len()
        )
        .green()
    );
}

fn commits_label(count: usize) -> String {
    if count == 1 {
        "1 commit".to_string()
    } else {
        format!("{count} commits")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_counts_are_pluralised() {
        assert_eq!(commits_label(0), "0 commits");
        assert_eq!(commits_label(1), "1 commit");
        assert_eq!(commits_label(2), "2 commits");
    }
}
