//! src/tickets/jira.rs
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{flatten_description, ActiveTicket, TicketRecord};
use crate::config::JiraCredentials;
use crate::errors::TrackerError;

const TRACKER: &str = "Jira";
const MAX_RESULTS: u32 = 100;
const FIELDS: [&str; 10] = [
    "summary",
    "description",
    "status",
    "priority",
    "issuetype",
    "reporter",
    "created",
    "updated",
    "labels",
    "components",
];

// --- 数据结构定义 ---
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    jql: String,
    fields: &'a [&'a str],
    max_results: u32,
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<Issue>,
}

#[derive(Deserialize, Debug)]
struct Issue {
    key: String,
    #[serde(default)]
    fields: IssueFields,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct IssueFields {
    summary: Option<String>,
    description: Option<Value>,
    status: Option<Named>,
    priority: Option<Priority>,
    issuetype: Option<Named>,
    reporter: Option<Person>,
    created: Option<String>,
    updated: Option<String>,
    labels: Vec<String>,
    components: Vec<Named>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct Named {
    name: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct Priority {
    id: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct Person {
    display_name: Option<String>,
}

impl Issue {
    fn into_active(self) -> ActiveTicket {
        let priority_id = self.fields.priority.as_ref().and_then(|p| p.id.clone());
        ActiveTicket {
            record: self.into_record(),
            priority_id,
        }
    }

    fn into_record(self) -> TicketRecord {
        let f = self.fields;
        TicketRecord {
            key: self.key,
            title: f.summary.unwrap_or_default(),
            description: flatten_description(f.description.as_ref()),
            status: f.status.map(|s| s.name).unwrap_or_default(),
            priority: f.priority.and_then(|p| p.name).unwrap_or_default(),
            issue_type: f.issuetype.map(|t| t.name).unwrap_or_default(),
            reporter: f.reporter.and_then(|r| r.display_name),
            created: f.created,
            updated: f.updated,
            labels: f.labels,
            components: f.components.into_iter().map(|c| c.name).collect(),
        }
    }
}

fn api_url(creds: &JiraCredentials, path: &str) -> String {
    format!("{}/rest/api/3/{}", creds.base_url.trim_end_matches('/'), path)
}

fn transport(error: reqwest::Error) -> TrackerError {
    TrackerError::Transport {
        tracker: TRACKER,
        error,
    }
}

fn decode(error: reqwest::Error) -> TrackerError {
    TrackerError::Decode {
        tracker: TRACKER,
        error,
    }
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, TrackerError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(TrackerError::Status {
        tracker: TRACKER,
        status,
        body,
    })
}

pub fn active_tickets_jql(assignee: &str) -> String {
    format!(
        r#"assignee = "{}" AND status IN ("To Do","In Progress") ORDER BY priority DESC, updated DESC"#,
        assignee.replace('"', "\\\"")
    )
}

pub async fn fetch_issue(
    client: &Client,
    creds: &JiraCredentials,
    key: &str,
) -> Result<TicketRecord, TrackerError> {
    let res = client
        .get(api_url(creds, &format!("issue/{key}")))
        .basic_auth(&creds.email, Some(&creds.api_token))
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(transport)?;
    let issue = check_status(res)
        .await?
        .json::<Issue>()
        .await
        .map_err(decode)?;
    Ok(issue.into_record())
}

/// Open tickets assigned to `assignee`, in tracker order.
pub async fn search_active(
    client: &Client,
    creds: &JiraCredentials,
    assignee: &str,
) -> Result<Vec<ActiveTicket>, TrackerError> {
    let payload = SearchRequest {
        jql: active_tickets_jql(assignee),
        fields: &FIELDS,
        max_results: MAX_RESULTS,
    };
    let res = client
        .post(api_url(creds, "search"))
        .basic_auth(&creds.email, Some(&creds.api_token))
        .header("Accept", "application/json")
        .json(&payload)
        .send()
        .await
        .map_err(transport)?;
    let response = check_status(res)
        .await?
        .json::<SearchResponse>()
        .await
        .map_err(decode)?;
    log::debug!("jira returned {} active issues", response.issues.len());
    Ok(response
        .issues
        .into_iter()
        .map(Issue::into_active)
        .collect())
}
