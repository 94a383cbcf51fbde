//! Shared fixtures for unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::config::{
    ComposeEnvs, DEFAULT_REPO_URL, Environment, LogLevel, NodeConfig, compose_url_for,
};
use crate::error::{CommandError, ConfigError, Result, SeedDeployError};
use crate::exec::{CommandOutput, ShellRunner};
use crate::setup::{Choice, MessageKind, TextQuestion, Wizard};

/// A valid, never-deployed record.
pub fn sample_config() -> NodeConfig {
    NodeConfig {
        domain: String::from("https://node1.seed.run"),
        email: String::from("ops@example.com"),
        compose_url: compose_url_for(DEFAULT_REPO_URL),
        compose_sha: String::new(),
        compose_envs: ComposeEnvs {
            log_level: LogLevel::Info,
        },
        environment: Environment::Prod,
        release_channel: String::from("latest"),
        testnet: false,
        link_secret: String::from("abc123XYZ0"),
        analytics: false,
        gateway: false,
        last_script_run: String::new(),
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Output(String),
    Fail,
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    replies: VecDeque<Reply>,
}

/// Scripted [`ShellRunner`].
///
/// Replies are chosen by substring match, with later rules taking
/// precedence. Unmatched commands succeed with empty output. `crontab -l`
/// and `crontab "<file>"` operate on an in-memory crontab.
#[derive(Debug, Default)]
pub struct FakeShell {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
    crontab: Mutex<Option<String>>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, pattern: &str, replies: Vec<Reply>) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                pattern: pattern.to_string(),
                replies: replies.into(),
            });
        }
        self
    }

    /// Replies to matching commands with `output`.
    pub fn on(self, pattern: &str, output: &str) -> Self {
        self.push(pattern, vec![Reply::Output(output.to_string())])
    }

    /// Replies with each output in turn, repeating the last one.
    pub fn on_sequence(self, pattern: &str, outputs: &[&str]) -> Self {
        self.push(
            pattern,
            outputs.iter().map(|o| Reply::Output((*o).to_string())).collect(),
        )
    }

    /// Fails matching commands with exit status 1.
    pub fn fail_on(self, pattern: &str) -> Self {
        self.push(pattern, vec![Reply::Fail])
    }

    /// Starts with an installed crontab.
    pub fn with_crontab(self, contents: &str) -> Self {
        if let Ok(mut crontab) = self.crontab.lock() {
            *crontab = Some(contents.to_string());
        }
        self
    }

    /// Commands run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Current in-memory crontab.
    pub fn crontab(&self) -> Option<String> {
        self.crontab.lock().ok().and_then(|c| c.clone())
    }

    fn respond(&self, command: &str) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command.to_string());
        }

        let reply = self.rules.lock().ok().and_then(|mut rules| {
            rules
                .iter_mut()
                .rev()
                .find(|rule| command.contains(&rule.pattern))
                .and_then(|rule| {
                    if rule.replies.len() > 1 {
                        rule.replies.pop_front()
                    } else {
                        rule.replies.front().cloned()
                    }
                })
        });

        match reply {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::Fail) => Err(failed(command)),
            None => self.builtin(command),
        }
    }

    fn builtin(&self, command: &str) -> Result<String> {
        if command.starts_with("crontab -l") {
            return self.crontab().ok_or_else(|| failed(command));
        }
        if let Some(file) = command.strip_prefix("crontab ") {
            let contents = std::fs::read_to_string(file.trim_matches('"'))?;
            if let Ok(mut crontab) = self.crontab.lock() {
                *crontab = Some(contents);
            }
        }
        Ok(String::new())
    }
}

fn failed(command: &str) -> SeedDeployError {
    CommandError::Failed {
        command: command.to_string(),
        status: 1,
        stderr: String::from("scripted failure"),
    }
    .into()
}

#[async_trait]
impl ShellRunner for FakeShell {
    async fn run(&self, command: &str) -> Result<String> {
        self.respond(command).map(|output| output.trim().to_string())
    }

    async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.respond(command).map(|stdout| CommandOutput {
            stdout,
            stderr: String::new(),
        })
    }

    async fn run_interactive(&self, command: &str) -> Result<()> {
        self.respond(command).map(|_| ())
    }
}

/// One scripted answer.
#[derive(Debug, Clone, Copy)]
pub enum Answer {
    Text(&'static str),
    Select(usize),
    Confirm(bool),
    Cancel,
}

/// [`Wizard`] that replays scripted answers and records what it was shown.
#[derive(Debug, Default)]
pub struct ScriptedWizard {
    answers: VecDeque<Answer>,
    defaults: Vec<String>,
    notes: Vec<String>,
}

impl ScriptedWizard {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: answers.into(),
            ..Self::default()
        }
    }

    /// Default offered for each question, as `kind:value`.
    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }

    /// Bodies of every note shown.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    fn next(&mut self) -> Result<Answer> {
        match self.answers.pop_front() {
            Some(Answer::Cancel) => Err(SeedDeployError::cancelled("Cancelled")),
            Some(answer) => Ok(answer),
            None => Err(SeedDeployError::internal("no scripted answer left")),
        }
    }
}

impl Wizard for ScriptedWizard {
    fn intro(&mut self, _title: &str) {}

    fn note(&mut self, _title: &str, body: &str) {
        self.notes.push(body.to_string());
    }

    fn message(&mut self, _kind: MessageKind, _text: &str) {}

    fn text(&mut self, question: &TextQuestion<'_>) -> Result<String> {
        self.defaults
            .push(format!("text:{}", question.initial.unwrap_or("")));
        match self.next()? {
            Answer::Text(value) => {
                (question.validator)(value)
                    .map_err(|message| ConfigError::validation(message, question.message))?;
                Ok(value.to_string())
            }
            other => Err(SeedDeployError::internal(format!("expected text, got {other:?}"))),
        }
    }

    fn select(&mut self, _message: &str, choices: &[Choice], default: usize) -> Result<usize> {
        self.defaults.push(format!("select:{default}"));
        match self.next()? {
            Answer::Select(index) if index < choices.len() => Ok(index),
            other => Err(SeedDeployError::internal(format!("expected select, got {other:?}"))),
        }
    }

    fn confirm(&mut self, _message: &str, default: bool) -> Result<bool> {
        self.defaults.push(format!("confirm:{default}"));
        match self.next()? {
            Answer::Confirm(value) => Ok(value),
            other => Err(SeedDeployError::internal(format!("expected confirm, got {other:?}"))),
        }
    }
}
