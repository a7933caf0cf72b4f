//! SSH Remote Collaborator
//!
//! Drives the system `ssh` client. Each operation is one `ssh` invocation
//! running a POSIX shell command on the node; there is no persistent
//! connection, so a "session" is the validated destination plus options.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::domain::ports::{
    ConnectPolicy, Credentials, EntryKind, RemoteConnector, RemoteEntry, RemoteSession,
};
use crate::domain::value_objects::{shell_quote, NodeId};
use crate::error::{RemoteError, RemoteResult};

/// Options shared by every `ssh` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshOptions {
    pub policy: ConnectPolicy,
    /// Accept unknown host keys instead of failing in batch mode.
    pub accept_new_host_keys: bool,
}

/// Opens sessions through the system `ssh` binary.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    options: SshOptions,
}

impl SshConnector {
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }
}

impl RemoteConnector for SshConnector {
    fn connect(
        &self,
        node: &NodeId,
        credentials: &Credentials,
    ) -> RemoteResult<Box<dyn RemoteSession>> {
        let session = SshSession {
            node: node.clone(),
            identity_file: credentials.identity_file.clone(),
            options: self.options.clone(),
        };

        self.options
            .policy
            .run(node, |_| session.run("true", None).map(|_| ()).map_err(|e| e.to_string()))?;

        Ok(Box::new(session))
    }
}

/// One node reachable over `ssh`.
pub struct SshSession {
    node: NodeId,
    identity_file: Option<PathBuf>,
    options: SshOptions,
}

impl SshSession {
    fn base_command(&self) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-p")
            .arg(self.node.port().to_string())
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!(
                "ConnectTimeout={}",
                self.options.policy.timeout.as_secs().max(1)
            ));
        if self.options.accept_new_host_keys {
            cmd.arg("-o").arg("StrictHostKeyChecking=no");
        }
        if let Some(identity) = &self.identity_file {
            cmd.arg("-i").arg(identity);
        }
        cmd.arg(self.node.destination());
        cmd
    }

    /// Run `command` on the node, optionally feeding a local file on stdin.
    fn run(&self, command: &str, input: Option<File>) -> RemoteResult<String> {
        let mut cmd = self.base_command();
        cmd.arg(command)
            .stdin(match input {
                Some(file) => Stdio::from(file),
                None => Stdio::null(),
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(node = %self.node, command, "ssh");
        let output = cmd.output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RemoteError::Command {
                command: command.to_string(),
                message: match output.status.code() {
                    Some(code) => format!("exit {}: {}", code, stderr.trim()),
                    None => format!("terminated by signal: {}", stderr.trim()),
                },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl RemoteSession for SshSession {
    fn transfer(&mut self, local: &Path, remote: &str) -> RemoteResult<()> {
        non_empty(remote)?;
        let file = File::open(local)?;
        self.run(&format!("cat > {}", shell_quote(remote)), Some(file))
            .map(|_| ())
            .map_err(|e| RemoteError::Transfer {
                local: local.to_path_buf(),
                remote: remote.to_string(),
                message: e.to_string(),
            })
    }

    fn create_directory(&mut self, remote: &str) -> RemoteResult<()> {
        non_empty(remote)?;
        self.run(&format!("mkdir {}", shell_quote(remote)), None)?;
        Ok(())
    }

    fn delete_file(&mut self, remote: &str) -> RemoteResult<()> {
        non_empty(remote)?;
        self.run(&format!("rm -f {}", shell_quote(remote)), None)?;
        Ok(())
    }

    fn delete_directory(&mut self, remote: &str) -> RemoteResult<()> {
        non_empty(remote)?;
        self.run(&format!("rmdir {}", shell_quote(remote)), None)?;
        Ok(())
    }

    fn list_children(&mut self, remote: &str) -> RemoteResult<Vec<RemoteEntry>> {
        non_empty(remote)?;
        let listing = self.run(&format!("ls -1Ap {}", shell_quote(remote)), None)?;
        Ok(parse_listing(&listing))
    }

    fn execute(&mut self, command: &str) -> RemoteResult<()> {
        let stdout = self.run(command, None)?;
        for line in stdout.lines() {
            debug!(node = %self.node, "{}", line);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        debug!(node = %self.node, "session closed");
    }
}

fn non_empty(remote: &str) -> RemoteResult<()> {
    if remote.is_empty() {
        Err(RemoteError::EmptyPath)
    } else {
        Ok(())
    }
}

/// Parse `ls -1Ap` output: one name per line, directories end in `/`.
fn parse_listing(listing: &str) -> Vec<RemoteEntry> {
    listing
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| match line.strip_suffix('/') {
            Some(dir) => RemoteEntry {
                name: dir.to_string(),
                kind: EntryKind::Directory,
            },
            None => RemoteEntry {
                name: line.to_string(),
                kind: EntryKind::File,
            },
        })
        .collect()
}
