//! src/git.rs

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::Project;
use crate::errors::ConfigError;

// --- Data Structures ---

/// One line of `git log` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitLine {
    pub hash: String,
    pub subject: String,
}

impl CommitLine {
    pub fn new(hash: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            subject: subject.into(),
        }
    }
}

/// Which commits a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanWindow {
    /// The last 24 hours.
    Recent,
    /// One calendar day, local time.
    Day(NaiveDate),
}

impl ScanWindow {
    pub fn parse_date(raw: &str) -> Result<Self, ConfigError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(ScanWindow::Day)
            .map_err(|_| ConfigError::InvalidDate(raw.to_string()))
    }

    fn git_args(&self) -> Vec<String> {
        match self {
            ScanWindow::Recent => vec!["--since=24 hours ago".to_string()],
            ScanWindow::Day(day) => vec![
                format!("--since={day} 00:00:00"),
                format!("--until={day} 23:59:59"),
            ],
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ScanWindow::Recent => "the last 24 hours".to_string(),
            ScanWindow::Day(day) => day.to_string(),
        }
    }
}

/// Source of commit lines for a project.
#[async_trait]
pub trait CommitSource: Send + Sync {
    async fn scan(
        &self,
        project: &Project,
        author: &str,
        window: ScanWindow,
    ) -> Result<Vec<CommitLine>>;
}

/// Reads commits by shelling out to `git log`.
pub struct GitLog;

#[async_trait]
impl CommitSource for GitLog {
    async fn scan(
        &self,
        project: &Project,
        author: &str,
        window: ScanWindow,
    ) -> Result<Vec<CommitLine>> {
        let path = project.resolved_path();
        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        let mut args = vec![
            "log".to_string(),
            "--all".to_string(),
            "--no-merges".to_string(),
            "--pretty=format:%h|%s".to_string(),
        ];
        if !author.trim().is_empty() {
            args.push(format!("--author={}", author.trim()));
        }
        args.extend(window.git_args());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = run_git_command(&path, &arg_refs).await?;
        Ok(parse_log_output(&output))
    }
}

// --- Public API ---

pub fn ensure_git_available() -> Result<(), ConfigError> {
    which::which("git")
        .map(|_| ())
        .map_err(|_| ConfigError::GitNotFound)
}

pub async fn run_git_command(repo: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to execute git command")?;

    if output.status.success() {
        Ok(String::from_utf8(output.stdout).context("Failed to parse git command output")?)
    } else {
        let stderr = String::from_utf8(output.stderr)
            .unwrap_or_else(|_| "Could not read stderr".to_string());
        Err(anyhow!(
            "Git command failed with status {}:\n{}",
            output.status,
            stderr.trim()
        ))
    }
}

/// Reads `user.name` from git config, used as the default author in setup.
pub async fn get_git_user_name() -> Option<String> {
    let output = Command::new("git")
        .args(["config", "user.name"])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!name.is_empty()).then_some(name)
}

// --- Helper Functions ---

fn parse_log_output(output: &str) -> Vec<CommitLine> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once('|') {
            Some((hash, subject)) => CommitLine::new(hash.trim(), subject.trim()),
            None => CommitLine::new("", line),
        })
        .collect()
}
