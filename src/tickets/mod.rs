//! src/tickets/mod.rs

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use crate::config::TrackerConfig;
use crate::errors::{ConfigError, TrackerError};

pub mod jira;
pub mod zoho;

pub const NO_DESCRIPTION: &str = "No description provided";

const JIRA_KEY_PATTERN: &str = r"\b([A-Z][A-Z0-9]+-\d+)\b";
const ZOHO_ID_PATTERN: &str = r"#(\d+)";

lazy_static! {
    static ref BUILTIN_PATTERNS: Vec<Regex> = [JIRA_KEY_PATTERN, ZOHO_ID_PATTERN]
        .iter()
        .map(|p| Regex::new(p).expect("built-in ticket pattern is valid"))
        .collect();
}

// --- 数据结构定义 ---

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TicketRecord {
    pub key: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub issue_type: String,
    pub reporter: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub labels: Vec<String>,
    pub components: Vec<String>,
}

impl TicketRecord {
    /// A record that only knows its title, as returned by Zoho.
    pub fn subject_only(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            description: NO_DESCRIPTION.to_string(),
            ..Default::default()
        }
    }

    /// The bracketed annotation appended to a commit line.
    pub fn annotation(&self) -> String {
        let mut parts = vec![format!("{}: {}", self.key, self.title)];
        if !self.status.is_empty() {
            parts.push(self.status.clone());
        }
        if !self.priority.is_empty() {
            parts.push(self.priority.clone());
        }
        format!("[{}]", parts.join(" | "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTicket {
    pub record: TicketRecord,
    pub priority_id: Option<String>,
}

/// Ordered ticket-id patterns: built-ins first, then the user's.
#[derive(Debug, Clone)]
pub struct TicketPatterns {
    patterns: Vec<Regex>,
}

impl TicketPatterns {
    pub fn new(custom: &[String]) -> Result<Self, ConfigError> {
        let mut patterns = BUILTIN_PATTERNS.clone();
        for source in custom {
            let regex = Regex::new(source).map_err(|error| ConfigError::InvalidPattern {
                pattern: source.clone(),
                error,
            })?;
            patterns.push(regex);
        }
        Ok(Self { patterns })
    }

    #[cfg(test)]
    fn from_regexes(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    /// First matching pattern wins. Capture group 1 is the id when present.
    pub fn extract(&self, subject: &str) -> Option<String> {
        self.patterns.iter().find_map(|pattern| {
            pattern.captures(subject).map(|caps| {
                caps.get(1)
                    .or_else(|| caps.get(0))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            })
        })
    }
}

/// Most urgent first; unknown names sort last.
pub fn priority_rank(priority: &str) -> u32 {
    match priority {
        "Highest" => 1,
        "High" => 2,
        "Medium" => 3,
        "Low" => 4,
        "None" => 5,
        _ => 999,
    }
}

/// Stable: equal ranks keep the order the tracker returned.
pub fn sort_by_priority(tickets: &mut [ActiveTicket]) {
    tickets.sort_by_key(|t| priority_rank(&t.record.priority));
}

/// Flattens a rich-text document into plain text by joining every text leaf
/// in document order with single spaces.
pub fn flatten_description(doc: Option<&Value>) -> String {
    let mut leaves = Vec::new();
    match doc {
        Some(Value::String(text)) => leaves.push(text.clone()),
        Some(value) => collect_text(value, &mut leaves),
        None => {}
    }
    let text = leaves
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let text = text.trim();
    if text.is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        text.to_string()
    }
}

fn collect_text(node: &Value, out: &mut Vec<String>) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                out.push(text.clone());
            }
            if let Some(Value::Array(children)) = map.get("content") {
                for child in children {
                    collect_text(child, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        _ => {}
    }
}

/// Ticket lookups used by the aggregator.
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// Never fails: any problem yields `None`. A missing id short-circuits.
    async fn fetch(&self, ticket_id: Option<&str>, tracker: &TrackerConfig)
        -> Option<TicketRecord>;

    /// Open tickets assigned to `assignee`, most urgent first.
    async fn list_active(
        &self,
        tracker: &TrackerConfig,
        assignee: &str,
    ) -> Result<Vec<ActiveTicket>, TrackerError>;
}

/// Talks to the real Jira / Zoho REST APIs.
pub struct HttpTrackers {
    client: Client,
}

impl HttpTrackers {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TicketSource for HttpTrackers {
    async fn fetch(
        &self,
        ticket_id: Option<&str>,
        tracker: &TrackerConfig,
    ) -> Option<TicketRecord> {
        let ticket_id = ticket_id?;
        let result = match tracker {
            TrackerConfig::Jira(creds) => jira::fetch_issue(&self.client, creds, ticket_id).await,
            TrackerConfig::Zoho(creds) => zoho::fetch_ticket(&self.client, creds, ticket_id).await,
        };
        match result {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("could not fetch {ticket_id} from {}: {e}", tracker.kind());
                None
            }
        }
    }

    async fn list_active(
        &self,
        tracker: &TrackerConfig,
        assignee: &str,
    ) -> Result<Vec<ActiveTicket>, TrackerError> {
        match tracker {
            TrackerConfig::Jira(creds) => {
                let mut tickets = jira::search_active(&self.client, creds, assignee).await?;
                sort_by_priority(&mut tickets);
                for t in &tickets {
                    log::debug!(
                        "{} priority {} (id {})",
                        t.record.key,
                        t.record.priority,
                        t.priority_id.as_deref().unwrap_or("-")
                    );
                }
                Ok(tickets)
            }
            TrackerConfig::Zoho(_) => {
                log::debug!("active ticket listing is not available for Zoho");
                Ok(Vec::new())
            }
        }
    }
}
