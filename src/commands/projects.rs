use anyhow::Result;
use colored::Colorize;

use crate::config::{self, Config, Project};

pub async fn handle_list_projects() -> Result<()> {
    let config = config::load_config().await?;
    if config.projects.is_empty() {
        println!(
            "{}",
            "No projects configured. Add one with `standupmate --add-project`.".yellow()
        );
        return Ok(());
    }

    println!("{}", format!("📁 {} project(s):", config.projects.len()).bold());
    for (i, project) in config.projects.iter().enumerate() {
        println!(
            "  {}. {}: {} {}",
            i + 1,
            project.name.cyan(),
            project.path,
            tracker_label(&config, project).dimmed()
        );
    }
    Ok(())
}

fn tracker_label(config: &Config, project: &Project) -> String {
    let own = project.jira.is_some() || project.zoho.is_some();
    match config.tracker_for(project) {
        Some(tracker) if own => format!("[{}]", tracker.kind()),
        Some(tracker) => format!("[global {}]", tracker.kind()),
        None => "[no tracker]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JiraCredentials;

    #[test]
    fn labels_distinguish_own_and_global_trackers() {
        let jira = JiraCredentials {
            base_url: "https://x".to_string(),
            email: "e".to_string(),
            api_token: "t".to_string(),
        };
        let own = Project {
            name: "own".to_string(),
            path: "/own".to_string(),
            jira: Some(jira.clone()),
            zoho: None,
        };
        let plain = Project {
            name: "plain".to_string(),
            path: "/plain".to_string(),
            jira: None,
            zoho: None,
        };
        let mut config = Config::default();
        assert_eq!(tracker_label(&config, &own), "[Jira]");
        assert_eq!(tracker_label(&config, &plain), "[no tracker]");
        config.jira = Some(jira);
        assert_eq!(tracker_label(&config, &plain), "[global Jira]");
    }
}
