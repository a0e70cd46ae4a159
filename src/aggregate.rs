//! src/aggregate.rs
//! Joins each project's commits with tracker data.

use colored::Colorize;

use crate::config::{Config, Project};
use crate::git::{CommitLine, CommitSource, ScanWindow};
use crate::tickets::{ActiveTicket, TicketPatterns, TicketRecord, TicketSource};

pub const NO_TICKET_LABEL: &str = "No ticket ID";
pub const NOT_FOUND_LABEL: &str = "Ticket not found";

/// What we know about the ticket a commit refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketLink {
    /// No pattern matched the subject.
    NoTicket,
    /// An id was found but the project has no tracker.
    Untracked(String),
    /// The tracker lookup failed.
    NotFound(String),
    Found(TicketRecord),
}

impl TicketLink {
    pub fn ticket_id(&self) -> Option<&str> {
        match self {
            TicketLink::NoTicket => None,
            TicketLink::Untracked(id) | TicketLink::NotFound(id) => Some(id.as_str()),
            TicketLink::Found(record) => Some(record.key.as_str()),
        }
    }

    fn annotation(&self) -> String {
        match self {
            TicketLink::NoTicket => format!("[{NO_TICKET_LABEL}]"),
            TicketLink::Untracked(id) => format!("[{id}]"),
            TicketLink::NotFound(id) => format!("[{id}: {NOT_FOUND_LABEL}]"),
            TicketLink::Found(record) => record.annotation(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDetail {
    pub commit: CommitLine,
    pub link: TicketLink,
}

impl CommitDetail {
    pub fn display_line(&self) -> String {
        let annotation = self.link.annotation();
        if self.commit.hash.is_empty() {
            format!("{}  {}", self.commit.subject, annotation)
        } else {
            format!("{} {}  {}", self.commit.hash, self.commit.subject, annotation)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectBundle {
    pub project_name: String,
    pub commit_lines: Vec<String>,
    pub commit_details: Vec<CommitDetail>,
    pub active_tickets: Vec<ActiveTicket>,
}

impl ProjectBundle {
    fn is_empty(&self) -> bool {
        self.commit_details.is_empty() && self.active_tickets.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Aggregate {
    /// Non-empty bundles in project declaration order.
    pub bundles: Vec<ProjectBundle>,
    pub total_commits: usize,
}

pub async fn aggregate_projects(
    config: &Config,
    patterns: &TicketPatterns,
    window: ScanWindow,
    commits: &dyn CommitSource,
    tickets: &dyn TicketSource,
) -> Aggregate {
    let mut aggregate = Aggregate::default();

    for project in &config.projects {
        let bundle = build_bundle(config, project, patterns, window, commits, tickets).await;
        aggregate.total_commits += bundle.commit_details.len();
        if bundle.is_empty() {
            log::debug!("dropping empty bundle for {}", project.name);
            continue;
        }
        aggregate.bundles.push(bundle);
    }

    aggregate
}

async fn build_bundle(
    config: &Config,
    project: &Project,
    patterns: &TicketPatterns,
    window: ScanWindow,
    commits: &dyn CommitSource,
    tickets: &dyn TicketSource,
) -> ProjectBundle {
    let lines = match commits.scan(project, &config.author, window).await {
        Ok(lines) => lines,
        Err(e) => {
            log::warn!("commit scan failed for {}: {e:#}", project.name);
            println!(
                "{}",
                format!("⚠️  {}: could not read commits: {e}", project.name).yellow()
            );
            Vec::new()
        }
    };

    let tracker = config.tracker_for(project);
    let mut details = Vec::with_capacity(lines.len());
    for commit in lines {
        let link = match (patterns.extract(&commit.subject), &tracker) {
            (None, _) => TicketLink::NoTicket,
            (Some(id), None) => TicketLink::Untracked(id),
            (Some(id), Some(tracker)) => match tickets.fetch(Some(id.as_str()), tracker).await {
                Some(record) => TicketLink::Found(record),
                None => TicketLink::NotFound(id),
            },
        };
        log::debug!(
            "{} {} -> {}",
            project.name,
            commit.hash,
            link.ticket_id().unwrap_or("no ticket")
        );
        details.push(CommitDetail { commit, link });
    }

    let active_tickets = match &tracker {
        Some(tracker) => match tickets.list_active(tracker, tracker.assignee()).await {
            Ok(list) => list,
            Err(e) => {
                log::warn!("active ticket listing failed for {}: {e}", project.name);
                println!(
                    "{}",
                    format!("⚠️  {}: could not list active tickets: {e}", project.name).yellow()
                );
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    ProjectBundle {
        project_name: project.name.clone(),
        commit_lines: details
            .iter()
            .map(|d| format!("{} {}", d.commit.hash, d.commit.subject).trim().to_string())
            .collect(),
        commit_details: details,
        active_tickets,
    }
}
