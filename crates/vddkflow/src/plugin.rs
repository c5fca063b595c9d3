//! ESX 側 `clone` プラグイン
//!
//! ラッパースクリプトに source と target をそのまま渡し、結果を
//! `{"status": ..., "message": ...}` の JSON 一行で返す。

use serde::Serialize;
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginOutcome {
    pub status: &'static str,
    pub message: String,
}

impl PluginOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"status":"{}","message":""}}"#, self.status)
        })
    }
}

/// `script <source> <target>` を実行する
pub async fn run_clone(script: &Path, source: &str, target: &str) -> PluginOutcome {
    if source.trim().is_empty() {
        return PluginOutcome::error("source is required");
    }
    if target.trim().is_empty() {
        return PluginOutcome::error("target is required");
    }

    tracing::debug!("Running {} {} {}", script.display(), source, target);

    let output = match Command::new(script).arg(source).arg(target).output().await {
        Ok(output) => output,
        Err(e) => {
            return PluginOutcome::error(format!(
                "failed to run {}: {}",
                script.display(),
                e
            ));
        }
    };

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            PluginOutcome::success(format!("Cloned {} to {}", source, target))
        } else {
            PluginOutcome::success(stdout)
        }
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            PluginOutcome::error(format!("clone failed ({})", output.status))
        } else {
            PluginOutcome::error(stderr)
        }
    }
}
