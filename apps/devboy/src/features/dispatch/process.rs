use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{bail, Context};
use devboy_types::RouteEntry;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Handler, HandlerContext, HandlerEvent, HandlerLoader};

/// Requires the handler module named by argv[1], feeds it `{ event, context }`
/// from stdin and prints the awaited result as JSON. Handler logging goes to
/// stderr so stdout carries only the result.
const RUNNER_SHIM: &str = r#"
const path = require('path');
console.log = console.error;
const handler = require(path.resolve(process.argv[1]));
let input = '';
process.stdin.setEncoding('utf8');
process.stdin.on('data', (chunk) => { input += chunk; });
process.stdin.on('end', async () => {
  try {
    const { event, context } = JSON.parse(input);
    const result = await handler(event, context);
    process.stdout.write(JSON.stringify(result === undefined ? null : result));
  } catch (err) {
    console.error(err && err.stack ? err.stack : String(err));
    process.exitCode = 1;
  }
});
"#;

/// Loads handler files from the project tree and runs each call in a fresh
/// runtime process.
#[derive(Debug, Clone)]
pub struct ProcessLoader {
    root: PathBuf,
    runtime: String,
}

impl ProcessLoader {
    pub fn new(root: impl Into<PathBuf>, runtime: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            runtime: runtime.into(),
        }
    }
}

impl HandlerLoader for ProcessLoader {
    fn load(&self, route: &RouteEntry) -> anyhow::Result<Arc<dyn Handler>> {
        let script = self.root.join(&route.handler_path);
        let meta = std::fs::metadata(&script)
            .with_context(|| format!("handler file {} is not readable", script.display()))?;
        if !meta.is_file() {
            bail!("handler {} is not a regular file", script.display());
        }

        Ok(Arc::new(ProcessHandler {
            runtime: self.runtime.clone(),
            script,
        }))
    }
}

struct ProcessHandler {
    runtime: String,
    script: PathBuf,
}

impl Handler for ProcessHandler {
    fn call(&self, event: HandlerEvent, context: HandlerContext) -> BoxFuture<'_, anyhow::Result<Value>> {
        Box::pin(async move {
            let payload = serde_json::to_vec(&json!({ "event": event, "context": context }))?;

            let mut child = Command::new(&self.runtime)
                .arg("-e")
                .arg(RUNNER_SHIM)
                .arg(&self.script)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .with_context(|| format!("failed to start handler runtime '{}'", self.runtime))?;

            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(&payload).await?;
            }

            let output = child.wait_with_output().await?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!(
                    "handler {} exited with {}: {}",
                    self.script.display(),
                    output.status,
                    stderr.trim()
                );
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            let stdout = stdout.trim();
            if stdout.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(stdout)
                .with_context(|| format!("handler {} returned invalid JSON", self.script.display()))
        })
    }
}
