//! src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::errors::ConfigError;
use crate::prompt::DEFAULT_TEMPLATE;
use crate::tickets::TicketPatterns;

const CONFIG_FILE_NAME: &str = "standupmate.json";
const TEMPLATE_FILE_NAME: &str = "standupmate-prompt.txt";
const CONFIG_PATH_ENV: &str = "STANDUPMATE_CONFIG";

pub const DEFAULT_ZOHO_BASE_URL: &str = "https://desk.zoho.com";

/// Returns the config file path: `$STANDUPMATE_CONFIG`, or `standupmate.json`
/// next to the running executable.
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let exe = env::current_exe().context("Could not locate the running executable")?;
    let dir = exe
        .parent()
        .context("Executable path has no parent directory")?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// The prompt template always sits beside the config file.
pub fn get_template_path() -> Result<PathBuf> {
    let config_path = get_config_path()?;
    let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(TEMPLATE_FILE_NAME))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    Chatgpt,
}

impl LlmProvider {
    pub const ALL: [LlmProvider; 2] = [LlmProvider::Gemini, LlmProvider::Chatgpt];

    pub fn api_key_env(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "GEMINI_API_KEY",
            LlmProvider::Chatgpt => "OPENAI_API_KEY",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "Gemini",
            LlmProvider::Chatgpt => "ChatGPT",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraCredentials {
    /// e.g. `https://company.atlassian.net`
    pub base_url: String,
    pub email: String,
    pub api_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZohoCredentials {
    #[serde(default = "default_zoho_base_url")]
    pub base_url: String,
    pub org_id: String,
    pub access_token: String,
}

fn default_zoho_base_url() -> String {
    DEFAULT_ZOHO_BASE_URL.to_string()
}

/// The tracker a project talks to once project overrides and globals are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerConfig {
    Jira(JiraCredentials),
    Zoho(ZohoCredentials),
}

impl TrackerConfig {
    /// The account whose open tickets the active listing asks for.
    /// Zoho has no listing, so it has no assignee.
    pub fn assignee(&self) -> &str {
        match self {
            TrackerConfig::Jira(creds) => &creds.email,
            TrackerConfig::Zoho(_) => "",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TrackerConfig::Jira(_) => "Jira",
            TrackerConfig::Zoho(_) => "Zoho",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira: Option<JiraCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoho: Option<ZohoCredentials>,
}

impl Project {
    /// The working directory, with a leading `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.path)
    }

    fn own_tracker(&self) -> Option<TrackerConfig> {
        self.jira
            .clone()
            .map(TrackerConfig::Jira)
            .or_else(|| self.zoho.clone().map(TrackerConfig::Zoho))
    }
}

/// Represents the persisted configuration. Every field is optional on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Passed to `git log --author`.
    pub author: String,
    pub llm_provider: LlmProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_retry_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jira: Option<JiraCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoho: Option<ZohoCredentials>,
    pub projects: Vec<Project>,
    pub custom_ticket_patterns: Vec<String>,
}

impl Config {
    /// Parses and validates a config file. Broken custom patterns are rejected here.
    pub fn from_json(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_json::from_str(content).map_err(|error| ConfigError::Malformed {
                path: path.to_path_buf(),
                error,
            })?;
        config.ticket_patterns()?;
        Ok(config)
    }

    /// Built-in ticket patterns followed by the compiled custom ones.
    pub fn ticket_patterns(&self) -> Result<TicketPatterns, ConfigError> {
        TicketPatterns::new(&self.custom_ticket_patterns)
    }

    /// Project credentials win over the global ones; Jira wins over Zoho.
    pub fn tracker_for(&self, project: &Project) -> Option<TrackerConfig> {
        project.own_tracker().or_else(|| {
            self.jira
                .clone()
                .map(TrackerConfig::Jira)
                .or_else(|| self.zoho.clone().map(TrackerConfig::Zoho))
        })
    }

    /// The API key for the selected provider. The environment overrides the file.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        let provider = self.llm_provider;
        let from_env = env::var(provider.api_key_env())
            .ok()
            .filter(|k| !k.trim().is_empty());
        let stored = match provider {
            LlmProvider::Gemini => self.gemini_api_key.clone(),
            LlmProvider::Chatgpt => self.openai_api_key.clone(),
        }
        .filter(|k| !k.trim().is_empty());

        from_env.or(stored).ok_or(ConfigError::MissingApiKey {
            provider: provider.label(),
            env_var: provider.api_key_env(),
        })
    }

    pub fn set_api_key(&mut self, provider: LlmProvider, key: String) {
        match provider {
            LlmProvider::Gemini => self.gemini_api_key = Some(key),
            LlmProvider::Chatgpt => self.openai_api_key = Some(key),
        }
    }

    pub fn has_api_key(&self, provider: LlmProvider) -> bool {
        let key = match provider {
            LlmProvider::Gemini => &self.gemini_api_key,
            LlmProvider::Chatgpt => &self.openai_api_key,
        };
        key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn retry_delay_override(&self) -> Option<Duration> {
        self.llm_retry_delay_ms.map(Duration::from_millis)
    }

    pub fn add_project(&mut self, project: Project) -> Result<(), ConfigError> {
        if self.projects.iter().any(|p| p.name == project.name) {
            return Err(ConfigError::DuplicateProject(project.name));
        }
        self.projects.push(project);
        Ok(())
    }
}

pub async fn config_exists() -> Result<bool> {
    let path = get_config_path()?;
    Ok(fs::try_exists(&path).await.unwrap_or(false))
}

pub async fn load_config() -> Result<Config> {
    let path = get_config_path()?;
    if !fs::try_exists(&path).await.unwrap_or(false) {
        return Err(ConfigError::Missing(path).into());
    }
    let content = fs::read_to_string(&path)
        .await
        .with_context(|| format!("Could not read config file {}", path.display()))?;
    let config = Config::from_json(&path, &content)?;
    log::debug!(
        "loaded config from {} ({} projects)",
        path.display(),
        config.projects.len()
    );
    Ok(config)
}

/// Writes the config and creates the prompt template if it does not exist yet.
pub async fn save_config(config: &Config) -> Result<PathBuf> {
    let path = get_config_path()?;
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)
                .await
                .context("Could not create config directory")?;
        }
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(&path, content)
        .await
        .with_context(|| format!("Could not write config file {}", path.display()))?;

    let template_path = get_template_path()?;
    if !template_path.exists() {
        fs::write(&template_path, DEFAULT_TEMPLATE)
            .await
            .context("Could not create the prompt template")?;
        log::info!("created prompt template at {}", template_path.display());
    }
    Ok(path)
}

pub async fn reset_config() -> Result<()> {
    let path = get_config_path()?;
    if fs::try_exists(&path).await.unwrap_or(false) {
        fs::remove_file(&path)
            .await
            .context("Could not remove existing config")?;
    }
    Ok(())
}

fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jira(base: &str) -> JiraCredentials {
        JiraCredentials {
            base_url: base.to_string(),
            email: "dev@example.com".to_string(),
            api_token: "token".to_string(),
        }
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = Config::from_json(Path::new("c.json"), r#"{"author": "Ada"}"#).unwrap();
        assert_eq!(config.author, "Ada");
        assert_eq!(config.llm_provider, LlmProvider::Gemini);
        assert!(config.projects.is_empty());
        assert!(config.custom_ticket_patterns.is_empty());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let json = r#"{"author": "Ada", "llmProvider": "chatgpt", "someFutureKey": 42}"#;
        let config = Config::from_json(Path::new("c.json"), json).unwrap();
        assert_eq!(config.llm_provider, LlmProvider::Chatgpt);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = Config::from_json(Path::new("c.json"), "{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
        assert!(err.to_string().contains("--setup"));
    }

    #[test]
    fn invalid_custom_pattern_fails_at_load() {
        let json = r#"{"customTicketPatterns": ["TASK_(\\d+)", "(unclosed"]}"#;
        let err = Config::from_json(Path::new("c.json"), json).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));

        let ok = r#"{"customTicketPatterns": ["TASK_(\\d+)"]}"#;
        let config = Config::from_json(Path::new("c.json"), ok).unwrap();
        assert_eq!(
            config.ticket_patterns().unwrap().extract("TASK_9 done"),
            Some("9".to_string())
        );
    }

    #[test]
    fn zoho_base_url_defaults() {
        let json = r#"{"projects": [{"name": "a", "path": "/a", "zoho": {"orgId": "1", "accessToken": "t"}}]}"#;
        let config = Config::from_json(Path::new("c.json"), json).unwrap();
        let zoho = config.projects[0].zoho.as_ref().unwrap();
        assert_eq!(zoho.base_url, DEFAULT_ZOHO_BASE_URL);
    }

    #[test]
    fn project_tracker_overrides_global() {
        let mut config = Config {
            jira: Some(jira("https://global.atlassian.net")),
            ..Default::default()
        };
        let own = Project {
            name: "own".to_string(),
            path: "/own".to_string(),
            jira: Some(jira("https://own.atlassian.net")),
            zoho: None,
        };
        let plain = Project {
            name: "plain".to_string(),
            path: "/plain".to_string(),
            jira: None,
            zoho: None,
        };
        config.projects = vec![own.clone(), plain.clone()];

        assert_eq!(
            config.tracker_for(&own),
            Some(TrackerConfig::Jira(jira("https://own.atlassian.net")))
        );
        assert_eq!(
            config.tracker_for(&plain),
            Some(TrackerConfig::Jira(jira("https://global.atlassian.net")))
        );

        config.jira = None;
        assert_eq!(config.tracker_for(&plain), None);
    }

    #[test]
    fn duplicate_project_names_are_rejected() {
        let mut config = Config::default();
        let project = Project {
            name: "api".to_string(),
            path: "/api".to_string(),
            jira: None,
            zoho: None,
        };
        config.add_project(project.clone()).unwrap();
        let err = config.add_project(project).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateProject(name) if name == "api"));
    }

    #[test]
    fn blank_stored_key_counts_as_missing() {
        let config = Config {
            llm_provider: LlmProvider::Chatgpt,
            openai_api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!config.has_api_key(LlmProvider::Chatgpt));
    }

    #[test]
    fn home_is_expanded() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/code/app"), home.join("code/app"));
        }
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    }
}
