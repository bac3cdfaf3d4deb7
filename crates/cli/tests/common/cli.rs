//! CLI command execution helpers with automatic timing
//!
//! Wraps the `desyn` binary. Every command runs inside a [`Sandbox`] so the
//! config file and data directory never touch the real home directory.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Isolated config and data directories for one test
pub struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    pub fn new() -> Result<Self> {
        Ok(Self {
            root: TempDir::new().context("Failed to create sandbox")?,
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.path().join("data")
    }

    pub fn config_home(&self) -> PathBuf {
        self.root.path().join("config")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_home().join("desyn").join("config.toml")
    }

    /// Start a `desyn` invocation with the sandbox wired in
    pub fn cmd(&self, args: &[&str]) -> DesynCommand {
        let data_dir = self.data_dir().to_string_lossy().into_owned();
        let mut cmd = DesynCommand::new(self.root.path());
        cmd.args(args)
            .args(&["--data-dir", data_dir.as_str()])
            .env("XDG_CONFIG_HOME", &self.config_home().to_string_lossy())
            .env("HOME", &self.root.path().to_string_lossy())
            .env("DESYN_LOG", "warn");
        cmd
    }

    /// Create a project and return its full ID
    pub fn new_project(&self, name: &str) -> Result<String> {
        let result = self.cmd(&["new", name]).assert_success()?;
        result
            .parse_document_id()
            .context("`desyn new` did not print a document ID")
    }
}

/// CLI command builder with timing
pub struct DesynCommand {
    working_dir: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    stdin_data: Option<String>,
}

impl DesynCommand {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            stdin_data: None,
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Provide stdin data; stdin closes after it is written
    pub fn stdin(&mut self, data: &str) -> &mut Self {
        self.stdin_data = Some(data.to_string());
        self
    }

    /// Execute command and return result with timing
    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();

        let mut child = Command::new(env!("CARGO_BIN_EXE_desyn"))
            .args(&self.args)
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn desyn")?;

        // Dropping the handle closes stdin so interactive sessions see EOF
        if let Some(mut stdin) = child.stdin.take() {
            use std::io::Write;
            if let Some(data) = &self.stdin_data {
                stdin.write_all(data.as_bytes())?;
            }
        }

        let output = child
            .wait_with_output()
            .context("Failed to wait for desyn")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// First document ID (ULID) printed on stdout
    pub fn parse_document_id(&self) -> Option<String> {
        self.stdout.lines().find_map(extract_ulid)
    }

    /// Value printed on a `Label:   value` summary line
    pub fn field(&self, label: &str) -> Option<String> {
        let prefix = format!("{}:", label);
        self.stdout
            .lines()
            .find_map(|line| line.strip_prefix(&prefix))
            .map(|rest| rest.trim().to_string())
    }
}

/// Extract a ULID from a line of text (colour codes allowed around it)
pub fn extract_ulid(line: &str) -> Option<String> {
    line.as_bytes()
        .windows(26)
        .position(|window| {
            window.iter().all(u8::is_ascii_alphanumeric)
                && std::str::from_utf8(window)
                    .ok()
                    .and_then(|s| ulid::Ulid::from_string(s).ok())
                    .is_some()
        })
        .map(|i| line[i..i + 26].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ulid_extraction() {
        let line = "  ID:  \u{1b}[33m01HXKJ7NVQW3Y2YMZK5VFZX3G8\u{1b}[39m";
        assert_eq!(
            extract_ulid(line),
            Some("01HXKJ7NVQW3Y2YMZK5VFZX3G8".to_string())
        );
        assert_eq!(extract_ulid("✓ Created walk"), None);
    }

    #[test]
    fn test_field() {
        let result = CommandResult {
            stdout: "Revision:  3\nStrokes:   2\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
            duration: Duration::from_millis(10),
        };

        assert_eq!(result.field("Revision").as_deref(), Some("3"));
        assert_eq!(result.field("Frames"), None);
    }
}
