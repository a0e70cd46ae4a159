use anyhow::Result;
use colored::Colorize;

use crate::config::{
    self, Config, JiraCredentials, LlmProvider, Project, ZohoCredentials, DEFAULT_ZOHO_BASE_URL,
};
use crate::git;
use crate::session::Session;
use crate::tickets::TicketPatterns;

/// 重置配置并重新运行向导
pub async fn handle_setup() -> Result<()> {
    config::reset_config().await?;
    run_setup_wizard().await?;
    Ok(())
}

pub async fn run_setup_wizard() -> Result<Config> {
    let mut session = Session::open();
    println!("{}", "👋 Let's set up standupmate.".cyan().bold());

    let default_author = git::get_git_user_name().await;
    let author = session.required(
        "Git author to report on (name or email)",
        default_author.as_deref(),
    )?;

    let provider = choose_provider(&mut session, LlmProvider::default())?;
    let api_key = session.secret(&format!("{provider} API key"))?;

    let mut config = Config {
        author,
        llm_provider: provider,
        ..Default::default()
    };
    config.set_api_key(provider, api_key);

    if session.confirm("Configure a Jira account shared by all projects?", false)? {
        config.jira = Some(prompt_jira(&mut session)?);
    }

    let mut first = true;
    loop {
        let question = if first {
            "Add a project now?"
        } else {
            "Add another project?"
        };
        if !session.confirm(question, first)? {
            break;
        }
        first = false;
        let project = prompt_project(&mut session)?;
        if let Err(e) = config.add_project(project) {
            println!("{}", format!("⚠️  {e}").yellow());
        }
    }

    config.custom_ticket_patterns = prompt_patterns(&mut session)?;
    drop(session);

    let path = config::save_config(&config).await?;
    println!("✅ Configuration saved to {}", path.display());
    Ok(config)
}

pub async fn handle_add_project() -> Result<()> {
    let mut config = config::load_config().await?;
    let project = {
        let mut session = Session::open();
        prompt_project(&mut session)?
    };
    let name = project.name.clone();
    config.add_project(project)?;
    config::save_config(&config).await?;
    println!("✅ Added project {}", name.cyan());
    Ok(())
}

pub async fn handle_switch_llm() -> Result<()> {
    let mut config = config::load_config().await?;
    {
        let mut session = Session::open();
        let provider = choose_provider(&mut session, config.llm_provider)?;
        if !config.has_api_key(provider) {
            let key = session.secret(&format!("{provider} API key"))?;
            config.set_api_key(provider, key);
        }
        config.llm_provider = provider;
    }
    config::save_config(&config).await?;
    println!("✅ Now using {}", config.llm_provider.to_string().cyan());
    Ok(())
}

fn choose_provider(session: &mut Session, current: LlmProvider) -> Result<LlmProvider> {
    let labels: Vec<_> = LlmProvider::ALL.iter().map(|p| p.label()).collect();
    let default = LlmProvider::ALL
        .iter()
        .position(|p| *p == current)
        .unwrap_or(0);
    let index = session.select("Which LLM should write your standup?", &labels, default)?;
    Ok(LlmProvider::ALL[index])
}

fn prompt_project(session: &mut Session) -> Result<Project> {
    let name = session.required("Project name", None)?;
    let cwd = std::env::current_dir()
        .ok()
        .map(|p| p.display().to_string());
    let path = session.required("Path to the git repository", cwd.as_deref())?;

    let trackers = ["No project tracker (use global settings)", "Jira", "Zoho"];
    let mut project = Project {
        name,
        path,
        jira: None,
        zoho: None,
    };
    match session.select("Issue tracker for this project", &trackers, 0)? {
        1 => project.jira = Some(prompt_jira(session)?),
        2 => project.zoho = Some(prompt_zoho(session)?),
        _ => {}
    }
    Ok(project)
}

fn prompt_jira(session: &mut Session) -> Result<JiraCredentials> {
    let base_url = session.required("Jira URL (e.g. https://company.atlassian.net)", None)?;
    let email = session.required("Jira account email", None)?;
    let api_token = session.secret("Jira API token")?;
    Ok(JiraCredentials {
        base_url: base_url.trim_end_matches('/').to_string(),
        email,
        api_token,
    })
}

fn prompt_zoho(session: &mut Session) -> Result<ZohoCredentials> {
    let base_url = session.required("Zoho Desk URL", Some(DEFAULT_ZOHO_BASE_URL))?;
    let org_id = session.required("Zoho organisation id", None)?;
    let access_token = session.secret("Zoho OAuth access token")?;
    Ok(ZohoCredentials {
        base_url: base_url.trim_end_matches('/').to_string(),
        org_id,
        access_token,
    })
}

fn prompt_patterns(session: &mut Session) -> Result<Vec<String>> {
    loop {
        let raw = session.input(
            "Extra ticket id patterns (regex, comma separated, optional)",
            None,
        )?;
        let patterns = split_patterns(&raw);
        match TicketPatterns::new(&patterns) {
            Ok(_) => return Ok(patterns),
            Err(e) => println!("{}", format!("⚠️  {e}").yellow()),
        }
    }
}

fn split_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_comma_separated_patterns() {
        assert_eq!(
            split_patterns(r" ticket/(\d+) , ,CR\d+ "),
            vec![r"ticket/(\d+)".to_string(), r"CR\d+".to_string()]
        );
        assert!(split_patterns("   ").is_empty());
    }
}
