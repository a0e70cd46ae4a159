//! src/prompt.rs

use colored::Colorize;
use std::path::Path;
use tokio::fs;

use crate::aggregate::ProjectBundle;
use crate::config;

pub const PROJECT_DATA: &str = "{PROJECT_DATA}";
pub const COMMITS: &str = "{COMMITS}";
pub const PROJECT_NAMES: &str = "{PROJECT_NAMES}";
pub const BLOCKERS: &str = "{BLOCKERS}";
pub const BLOCKER_SECTION: &str = "{BLOCKER_SECTION}";

pub const DEFAULT_TEMPLATE: &str = r#"You are helping a software developer prepare their daily standup update.

Below is what they worked on, grouped by project. Each commit line may carry the
ticket it belongs to in square brackets. Active tickets are work still open and
assigned to them.

{PROJECT_DATA}

Blockers reported by the developer: {BLOCKERS}

Write the standup update with exactly these three sections, in this order:
Yesterday
Today
Blockers

Rules:
1. Plain text only. Do not use bold, italics, headings or any markdown.
2. Start every item with the bullet character "•" followed by a space.
3. Group related commits into one item and mention ticket keys where known.
4. Base "Today" on the active tickets, most urgent first.
5. If there are no blockers, write "• None" under Blockers.
6. Keep it short enough to read aloud in under a minute.
"#;

/// Reads the user's template, falling back to the built-in one.
pub async fn load_template() -> String {
    match config::get_template_path() {
        Ok(path) => load_template_from(&path).await,
        Err(e) => {
            println!(
                "{}",
                format!("⚠️  Could not locate the prompt template ({e}); using the default.").yellow()
            );
            DEFAULT_TEMPLATE.to_string()
        }
    }
}

pub async fn load_template_from(path: &Path) -> String {
    if !path.exists() {
        log::debug!("no template at {}, using default", path.display());
        return DEFAULT_TEMPLATE.to_string();
    }
    match fs::read_to_string(path).await {
        Ok(content) if !content.trim().is_empty() => content,
        Ok(_) => {
            log::debug!("template at {} is empty, using default", path.display());
            DEFAULT_TEMPLATE.to_string()
        }
        Err(e) => {
            println!(
                "{}",
                format!(
                    "⚠️  Could not read prompt template {}: {e}. Using the default.",
                    path.display()
                )
                .yellow()
            );
            DEFAULT_TEMPLATE.to_string()
        }
    }
}

/// Plain substring replacement. Placeholders missing from the template
/// simply drop their data.
pub fn render(template: &str, bundles: &[ProjectBundle], blockers: &str) -> String {
    let names = bundles
        .iter()
        .map(|b| b.project_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    template
        .replace(PROJECT_DATA, &project_data(bundles))
        .replace(COMMITS, &commits_only(bundles))
        .replace(PROJECT_NAMES, &names)
        .replace(BLOCKER_SECTION, &format!("Blockers: {blockers}"))
        .replace(BLOCKERS, blockers)
}

fn project_data(bundles: &[ProjectBundle]) -> String {
    let mut out = String::new();
    for bundle in bundles {
        out.push_str(&format!("=== Project: {} ===\n", bundle.project_name));

        out.push_str("Commits:\n");
        if bundle.commit_details.is_empty() {
            out.push_str("  (none)\n");
        }
        for detail in &bundle.commit_details {
            out.push_str(&format!("  - {}\n", detail.display_line()));
        }

        if !bundle.active_tickets.is_empty() {
            out.push_str("Active tickets:\n");
            for ticket in &bundle.active_tickets {
                let r = &ticket.record;
                out.push_str(&format!("  {} [{}][{}]\n", r.key, r.status, r.priority));
                out.push_str(&format!("    Title: {}\n", r.title));
                out.push_str(&format!("    Description: {}\n", r.description));
                out.push_str(&format!("    Type: {}\n", r.issue_type));
                if let Some(reporter) = &r.reporter {
                    out.push_str(&format!("    Reporter: {reporter}\n"));
                }
                if !r.labels.is_empty() {
                    out.push_str(&format!("    Labels: {}\n", r.labels.join(", ")));
                }
                if !r.components.is_empty() {
                    out.push_str(&format!("    Components: {}\n", r.components.join(", ")));
                }
                if let Some(updated) = r.updated.as_ref().or(r.created.as_ref()) {
                    out.push_str(&format!("    Last updated: {updated}\n"));
                }
            }
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn commits_only(bundles: &[ProjectBundle]) -> String {
    bundles
        .iter()
        .flat_map(|b| {
            b.commit_lines
                .iter()
                .map(move |line| format!("[{}] {}", b.project_name, line))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
