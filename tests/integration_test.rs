// tests/integration_test.rs

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::{tempdir, TempDir};

// --- Test Setup Helper ---

struct TestEnv {
    temp_dir: TempDir,
    standupmate_path: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let standupmate_path = assert_cmd::cargo::cargo_bin("standupmate");
        Self {
            temp_dir,
            standupmate_path,
        }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn config_path(&self) -> PathBuf {
        self.path().join("standupmate.json")
    }

    fn write_config(&self, config: Value) {
        fs::write(self.config_path(), serde_json::to_string_pretty(&config).unwrap())
            .expect("Failed to write test config");
    }

    /// A git repository whose commits are authored by `author`.
    fn repo(&self, name: &str, author: &str, subjects: &[&str]) -> PathBuf {
        let repo = self.path().join(name);
        fs::create_dir_all(&repo).expect("Failed to create repo dir");
        run_git_command(&repo, &["init"]);
        run_git_command(&repo, &["config", "user.name", author]);
        run_git_command(&repo, &["config", "user.email", "test@example.com"]);
        run_git_command(&repo, &["config", "commit.gpgsign", "false"]);
        for subject in subjects {
            run_git_command(&repo, &["commit", "--allow-empty", "-m", subject]);
        }
        repo
    }

    fn standupmate(&self) -> Command {
        let mut cmd = Command::new(&self.standupmate_path);
        cmd.current_dir(self.path());
        cmd.env("HOME", self.path());
        cmd.env("USERPROFILE", self.path());
        cmd.env("STANDUPMATE_CONFIG", self.config_path());
        cmd.env("NO_COLOR", "1");
        cmd.env("CLICOLOR", "0");
        cmd.env_remove("GEMINI_API_KEY");
        cmd.env_remove("OPENAI_API_KEY");
        cmd.env_remove("RUST_LOG");
        cmd.stdin(Stdio::null());
        cmd
    }
}

fn run_git_command(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(dir)
        .env("HOME", dir)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .unwrap_or_else(|_| panic!("Failed to execute git command: {:?}", args));
    assert!(
        output.status.success(),
        "Git command failed: {:?}, stderr: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn base_config(server_url: &str, projects: Value) -> Value {
    json!({
        "author": "Test User",
        "llmProvider": "chatgpt",
        "openaiApiKey": "sk-test",
        "openaiApiBase": server_url,
        "llmRetryDelayMs": 0,
        "projects": projects
    })
}

fn mock_openai_api(server: &mut mockito::Server, content: &str) -> mockito::Mock {
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "chatcmpl-123",
                "object": "chat.completion",
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": content},
                    "finish_reason": "stop"
                }]
            })
            .to_string(),
        )
        .create()
}

// --- Tests ---

#[test]
fn standup_annotates_commits_with_jira_tickets() {
    let mut server = mockito::Server::new();
    let issue = server
        .mock("GET", "/rest/api/3/issue/PROJ-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "key": "PROJ-1",
                "fields": {
                    "summary": "Fix login",
                    "status": {"name": "In Progress"},
                    "priority": {"id": "2", "name": "High"},
                    "issuetype": {"name": "Bug"}
                }
            })
            .to_string(),
        )
        .create();
    let search = server
        .mock("POST", "/rest/api/3/search")
        .with_status(200)
        .with_body(r#"{"issues": []}"#)
        .create();
    let llm = mock_openai_api(&mut server, "• Fixed the login bug");

    let env = TestEnv::new();
    let repo = env.repo("api", "Test User", &["PROJ-1 fix bug", "tidy up logging"]);
    let mut config = base_config(
        &server.url(),
        json!([{"name": "api", "path": repo.display().to_string()}]),
    );
    config["jira"] = json!({
        "baseUrl": server.url(),
        "email": "test@example.com",
        "apiToken": "jira-token"
    });
    env.write_config(config);

    env.standupmate()
        .args(["--blocker", "None"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "PROJ-1 fix bug  [PROJ-1: Fix login | In Progress | High]",
        ))
        .stdout(predicate::str::contains("tidy up logging  [No ticket ID]"))
        .stdout(predicate::str::contains("Found 2 commits"))
        .stdout(predicate::str::contains("• Fixed the login bug"));

    issue.assert();
    search.assert();
    llm.assert();
}

#[test]
fn no_commits_skips_the_llm() {
    let mut server = mockito::Server::new();
    let llm = server.mock("POST", "/chat/completions").expect(0).create();

    let env = TestEnv::new();
    let repo = env.repo("other", "Someone Else", &["not mine"]);
    env.write_config(base_config(
        &server.url(),
        json!([{"name": "other", "path": repo.display().to_string()}]),
    ));

    env.standupmate()
        .args(["-b", "None"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No commits found"));

    llm.assert();
}

#[test]
fn rate_limited_llm_degrades_without_failing() {
    let mut server = mockito::Server::new();
    let llm = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body(
            r#"{"error": {"message": "Rate limit reached for gpt-4o-mini", "type": "requests", "code": "rate_limit_exceeded"}}"#,
        )
        .expect(1)
        .create();

    let env = TestEnv::new();
    let repo = env.repo("api", "Test User", &["PROJ-1 fix bug"]);
    env.write_config(base_config(
        &server.url(),
        json!([{"name": "api", "path": repo.display().to_string()}]),
    ));

    env.standupmate()
        .arg("-b")
        .assert()
        .success()
        .stdout(predicate::str::contains("PROJ-1 fix bug  [PROJ-1]"))
        .stdout(predicate::str::contains("Could not generate the AI standup"))
        .stdout(predicate::str::contains("Standup (").not());

    llm.assert();
}

#[test]
fn gemini_provider_is_supported() {
    let mut server = mockito::Server::new();
    let llm = server
        .mock("POST", "/models/gemini-2.0-flash:generateContent")
        .match_header("x-goog-api-key", "g-key")
        .with_status(200)
        .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "• Yesterday I tidied code"}]}}]}"#)
        .create();

    let env = TestEnv::new();
    let repo = env.repo("api", "Test User", &["refactor parser"]);
    env.write_config(json!({
        "author": "Test User",
        "llmProvider": "gemini",
        "geminiApiKey": "g-key",
        "geminiApiBase": server.url(),
        "llmRetryDelayMs": 0,
        "projects": [{"name": "api", "path": repo.display().to_string()}]
    }));

    env.standupmate()
        .args(["-b", "nothing blocking"])
        .assert()
        .success()
        .stdout(predicate::str::contains("• Yesterday I tidied code"));

    llm.assert();
}

#[test]
fn broken_project_path_does_not_stop_the_run() {
    let mut server = mockito::Server::new();
    let llm = mock_openai_api(&mut server, "• Worked on api");

    let env = TestEnv::new();
    let repo = env.repo("api", "Test User", &["add endpoint"]);
    env.write_config(base_config(
        &server.url(),
        json!([
            {"name": "gone", "path": env.path().join("missing").display().to_string()},
            {"name": "api", "path": repo.display().to_string()}
        ]),
    ));

    env.standupmate()
        .args(["-b", "None"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gone: could not read commits"))
        .stdout(predicate::str::contains("api (1 commit)"))
        .stdout(predicate::str::contains("Found 1 commit across"));

    llm.assert();
}

#[test]
fn invalid_date_is_a_usage_error() {
    let env = TestEnv::new();
    env.write_config(base_config("http://127.0.0.1:1", json!([])));

    env.standupmate()
        .args(["--date", "31/05/2024"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("YYYY-MM-DD"));
}

#[test]
fn missing_api_key_is_fatal() {
    let env = TestEnv::new();
    env.write_config(json!({
        "author": "Test User",
        "llmProvider": "chatgpt",
        "projects": []
    }));

    env.standupmate()
        .args(["-b", "None"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn list_projects_shows_trackers() {
    let env = TestEnv::new();
    env.write_config(json!({
        "author": "Test User",
        "projects": [
            {"name": "api", "path": "/src/api", "jira": {"baseUrl": "https://x", "email": "e", "apiToken": "t"}},
            {"name": "web", "path": "/src/web"}
        ]
    }));

    env.standupmate()
        .arg("--list-projects")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 project(s)"))
        .stdout(predicate::str::contains("[Jira]"))
        .stdout(predicate::str::contains("/src/web"))
        .stdout(predicate::str::contains("[no tracker]"));
}

#[test]
fn fetch_tickets_lists_active_jira_work() {
    let mut server = mockito::Server::new();
    let search = server
        .mock("POST", "/rest/api/3/search")
        .with_status(200)
        .with_body(
            json!({"issues": [
                {"key": "API-2", "fields": {"summary": "Later", "priority": {"name": "Low"}, "status": {"name": "To Do"}}},
                {"key": "API-1", "fields": {"summary": "Urgent", "priority": {"name": "Highest"}, "status": {"name": "In Progress"}}}
            ]})
            .to_string(),
        )
        .create();

    let env = TestEnv::new();
    env.write_config(json!({
        "author": "Test User",
        "projects": [{
            "name": "api",
            "path": "/src/api",
            "jira": {"baseUrl": server.url(), "email": "test@example.com", "apiToken": "t"}
        }]
    }));

    let output = env.standupmate().arg("--fetch-tickets").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let urgent = stdout.find("API-1 [In Progress][Highest]").expect("API-1 listed");
    let later = stdout.find("API-2 [To Do][Low]").expect("API-2 listed");
    assert!(urgent < later, "tickets should be sorted by priority:\n{stdout}");

    search.assert();
}

#[test]
fn broken_custom_pattern_is_rejected_by_every_command() {
    let env = TestEnv::new();
    env.write_config(json!({
        "author": "Test User",
        "projects": [{"name": "api", "path": "/src/api"}],
        "customTicketPatterns": ["(unclosed"]
    }));

    for flag in ["--list-projects", "--fetch-tickets"] {
        env.standupmate()
            .arg(flag)
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("customTicketPatterns"));
    }
}
