// ABOUTME: File-drop deferred task queue shared between separate processes
// ABOUTME: Producers publish one JSON descriptor per file; consumers take due files and delete them

//! # Protocol
//!
//! The queue is a directory. Each task is one file holding a single JSON
//! object:
//!
//! ```json
//! { "type": "schedule_task", "prompt": "...", "schedule_type": "once",
//!   "schedule_value": "2026-10-18T12:00:15+00:00", "targetJid": "dc:123" }
//! ```
//!
//! - File names are `task-<unix-nanos>-<random>.json`, so concurrent
//!   producers never overwrite each other and names sort chronologically.
//! - Content is written to a dotfile first and renamed into place, so a
//!   consumer never sees a partial descriptor. Consumers skip dotfiles and
//!   anything not ending in `.json`.
//! - Files are made world read/write, and a directory the producer creates
//!   is made world writable, so a consumer running as another user can
//!   delete them.
//! - Delivery is at-least-once from the producer's side and nothing retries:
//!   a task the consumer never observes is lost.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::metrics;

/// File extension of published task files
const TASK_EXT: &str = ".json";

/// Suffix appended to task files that fail to parse
const INVALID_EXT: &str = ".invalid";

/// Permission bits for published task files
#[cfg(unix)]
const TASK_FILE_MODE: u32 = 0o666;

/// Mode for a drop directory the producer creates; any user may unlink in it
#[cfg(unix)]
const TASK_DIR_MODE: u32 = 0o777;

/// Task type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    ScheduleTask,
}

/// How `schedule_value` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    /// `schedule_value` is an RFC 3339 timestamp
    Once,
    /// `schedule_value` is a cron expression (accepted, never produced here)
    Cron,
    /// `schedule_value` is an interval in milliseconds (accepted, never produced here)
    Interval,
}

/// A single immutable task descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub prompt: String,
    pub schedule_type: ScheduleType,
    pub schedule_value: String,
    #[serde(rename = "targetJid")]
    pub target_jid: String,
}

impl TaskDescriptor {
    /// A `once` task due at `at`
    pub fn once(prompt: impl Into<String>, target_jid: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind: TaskKind::ScheduleTask,
            prompt: prompt.into(),
            schedule_type: ScheduleType::Once,
            schedule_value: at.to_rfc3339(),
            target_jid: target_jid.into(),
        }
    }

    /// Due time of a `once` task; `None` for recurring schedules
    pub fn due_at(&self) -> Option<Result<DateTime<Utc>>> {
        match self.schedule_type {
            ScheduleType::Once => Some(
                DateTime::parse_from_rfc3339(&self.schedule_value)
                    .map(|dt| dt.with_timezone(&Utc))
                    .with_context(|| {
                        format!("Invalid schedule_value timestamp: {}", self.schedule_value)
                    }),
            ),
            ScheduleType::Cron | ScheduleType::Interval => None,
        }
    }
}

/// A task taken off the queue, with the file name it arrived under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTask {
    pub file_name: String,
    pub task: TaskDescriptor,
}

/// Unique, chronologically sortable file name for a task published at `at`
pub fn task_file_name(at: DateTime<Utc>) -> String {
    let nanos = at.timestamp_nanos_opt().unwrap_or_default();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("task-{:020}-{}{}", nanos, &suffix[..8], TASK_EXT)
}

fn is_task_file(name: &str) -> bool {
    !name.starts_with('.') && name.ends_with(TASK_EXT)
}

/// Handle on a task drop directory
#[derive(Debug, Clone)]
pub struct TaskQueue {
    dir: PathBuf,
}

impl TaskQueue {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // -------------------------------------------------------------------------
    // Producer
    // -------------------------------------------------------------------------

    /// Schedule a one-shot task `delay` from now and publish it
    pub async fn schedule_once(
        &self,
        prompt: &str,
        target_jid: &str,
        delay: Duration,
    ) -> Result<PathBuf> {
        let delay = chrono::Duration::from_std(delay).context("Delay out of range")?;
        let task = TaskDescriptor::once(prompt, target_jid, Utc::now() + delay);
        self.publish(&task).await
    }

    /// Publish a descriptor under a fresh unique name.
    ///
    /// The file only appears under its final name once fully written.
    pub async fn publish(&self, task: &TaskDescriptor) -> Result<PathBuf> {
        self.ensure_dir().await?;

        let file_name = task_file_name(Utc::now());
        let final_path = self.dir.join(&file_name);
        let tmp_path = self.dir.join(format!(".{}.tmp", file_name));

        let body = serde_json::to_vec_pretty(task)?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .await
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(
                &tmp_path,
                std::fs::Permissions::from_mode(TASK_FILE_MODE),
            )
            .await
            .with_context(|| format!("Failed to set permissions on {}", tmp_path.display()))?;
        }

        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .with_context(|| format!("Failed to publish {}", final_path.display()))?;

        metrics::record_task_written();
        tracing::info!(
            path = %final_path.display(),
            target_jid = %task.target_jid,
            schedule_value = %task.schedule_value,
            "Task file published"
        );
        Ok(final_path)
    }

    /// Create the drop directory if missing. A directory created here is
    /// opened up to every user; an existing one is left as its owner set it.
    async fn ensure_dir(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.dir).await.unwrap_or(false) {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create task dir {}", self.dir.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.dir, std::fs::Permissions::from_mode(TASK_DIR_MODE))
                .await
                .with_context(|| {
                    format!("Failed to set permissions on task dir {}", self.dir.display())
                })?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Consumer
    // -------------------------------------------------------------------------

    /// Names of all published task files, oldest first
    pub async fn pending_files(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read task dir {}", self.dir.display()))
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if is_task_file(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Take every task that is due at `now`, deleting its file.
    ///
    /// Recurring schedules are handed over immediately; the downstream
    /// scheduler owns their timing. Future `once` tasks stay on disk.
    /// Unparsable files are renamed to `<name>.invalid` and skipped.
    pub async fn take_due(&self, now: DateTime<Utc>) -> Result<Vec<QueuedTask>> {
        let mut taken = Vec::new();

        for file_name in self.pending_files().await? {
            let path = self.dir.join(&file_name);
            let raw = match tokio::fs::read(&path).await {
                Ok(raw) => raw,
                // Another consumer got there first
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read task file");
                    continue;
                }
            };

            let task: TaskDescriptor = match serde_json::from_slice(&raw) {
                Ok(task) => task,
                Err(e) => {
                    self.set_aside(&path, &file_name, &e.to_string()).await;
                    continue;
                }
            };

            let due = match task.due_at() {
                None => true,
                Some(Ok(at)) => at <= now,
                Some(Err(e)) => {
                    self.set_aside(&path, &file_name, &e.to_string()).await;
                    continue;
                }
            };
            if !due {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove task file");
                    continue;
                }
            }

            metrics::record_task_taken();
            tracing::debug!(file = %file_name, target_jid = %task.target_jid, "Took due task");
            taken.push(QueuedTask { file_name, task });
        }

        Ok(taken)
    }

    async fn set_aside(&self, path: &Path, file_name: &str, reason: &str) {
        metrics::record_task_invalid();
        tracing::warn!(file = %file_name, reason = %reason, "Setting aside invalid task file");
        let invalid = self.dir.join(format!("{}{}", file_name, INVALID_EXT));
        if let Err(e) = tokio::fs::rename(path, &invalid).await {
            tracing::warn!(file = %file_name, error = %e, "Failed to set aside task file");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
