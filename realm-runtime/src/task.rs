//! The [`Task`] trait and the stock implementations behind declared tasks.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::RealmContext;
use crate::error::{io_err, RuntimeError};
use crate::realm::Realm;

/// Environment variable carrying a command task's params as JSON.
pub const PARAMS_ENV: &str = "REALM_TASK_PARAMS";

/// What a running task can see: the realm it was dispatched on and the
/// process-scoped context.
#[derive(Clone)]
pub struct TaskContext {
    pub realm: Arc<Realm>,
    pub context: RealmContext,
}

/// A named callable registered in a realm's task registry.
#[async_trait]
pub trait Task: Send + Sync {
    async fn run(&self, cx: &TaskContext, params: Value) -> Result<Value, RuntimeError>;

    /// `false` for placeholders that fail whenever they run.
    fn is_bound(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Closure tasks
// ---------------------------------------------------------------------------

/// Adapts a synchronous closure into a [`Task`].
pub struct FnTask<F>(F);

#[async_trait]
impl<F> Task for FnTask<F>
where
    F: Fn(&TaskContext, Value) -> Result<Value, RuntimeError> + Send + Sync,
{
    async fn run(&self, cx: &TaskContext, params: Value) -> Result<Value, RuntimeError> {
        (self.0)(cx, params)
    }
}

/// Wrap `f` as a shareable task.
pub fn task_fn<F>(f: F) -> Arc<dyn Task>
where
    F: Fn(&TaskContext, Value) -> Result<Value, RuntimeError> + Send + Sync + 'static,
{
    Arc::new(FnTask(f))
}

// ---------------------------------------------------------------------------
// Shell command tasks
// ---------------------------------------------------------------------------

/// Runs a configured shell command in the executing realm's directory.
///
/// Params are exported as JSON in [`PARAMS_ENV`]; trimmed stdout is the
/// result. A non-zero exit becomes [`RuntimeError::TaskFailed`] carrying
/// stderr.
#[derive(Debug, Clone)]
pub struct CommandTask {
    name: String,
    command: String,
}

impl CommandTask {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

#[async_trait]
impl Task for CommandTask {
    async fn run(&self, cx: &TaskContext, params: Value) -> Result<Value, RuntimeError> {
        let cwd = cx.realm.cwd();
        tracing::debug!(task = %self.name, cwd = %cwd.display(), command = %self.command, "running command task");

        let output = shell(&self.command)
            .current_dir(cwd)
            .env(PARAMS_ENV, params.to_string())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| io_err(cwd, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(RuntimeError::TaskFailed {
                task: self.name.clone(),
                message,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(Value::String(stdout.trim().to_string()))
    }
}

#[cfg(unix)]
fn shell(command: &str) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

// ---------------------------------------------------------------------------
// Placeholders
// ---------------------------------------------------------------------------

/// Stands in for a declared task nobody has bound an implementation to.
#[derive(Debug, Clone)]
pub struct UnboundTask {
    name: String,
}

impl UnboundTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Task for UnboundTask {
    async fn run(&self, _cx: &TaskContext, _params: Value) -> Result<Value, RuntimeError> {
        Err(RuntimeError::TaskNotBound(self.name.clone()))
    }

    fn is_bound(&self) -> bool {
        false
    }
}
