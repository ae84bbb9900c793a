//! Append-only artifact persistence, keyed by `snapshot_id` and grouped by
//! UTC date (spec §6). Grounded in the teacher's repository-trait pattern
//! (`domain::repositories` + `infrastructure::persistence`): a trait with
//! an in-memory test double and a JSON-Lines file-backed implementation.
//! File format is a crate implementation choice, not contractual.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// The kind of artifact being persisted, one file-per-kind-per-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArtifactKind {
    RawKlines,
    IndicatorFrames,
    FeatureSnapshots,
    QuantAnalyses,
    Decisions,
    RiskAudits,
    ExecutionRecords,
    PositionClosures,
}

impl ArtifactKind {
    fn file_stem(self) -> &'static str {
        match self {
            ArtifactKind::RawKlines => "raw_klines",
            ArtifactKind::IndicatorFrames => "indicator_frames",
            ArtifactKind::FeatureSnapshots => "feature_snapshots",
            ArtifactKind::QuantAnalyses => "quant_analyses",
            ArtifactKind::Decisions => "decisions",
            ArtifactKind::RiskAudits => "risk_audits",
            ArtifactKind::ExecutionRecords => "execution_records",
            ArtifactKind::PositionClosures => "position_closures",
        }
    }
}

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    async fn append_value(
        &self,
        kind: ArtifactKind,
        symbol: &str,
        snapshot_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<()>;
}

/// Convenience wrapper, serializing `payload` before delegating to
/// [`SnapshotRepository::append_value`].
pub async fn append<R: SnapshotRepository + ?Sized, T: Serialize>(
    repo: &R,
    kind: ArtifactKind,
    symbol: &str,
    snapshot_id: Uuid,
    payload: &T,
) -> Result<()> {
    let value = serde_json::to_value(payload).context("serializing artifact")?;
    repo.append_value(kind, symbol, snapshot_id, value).await
}

/// JSON-Lines file-backed repository: one file per
/// `(kind, symbol, UTC day)`, lines appended as
/// `{"snapshot_id": ..., ...payload fields}`.
pub struct JsonLinesRepository {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn path_for(&self, kind: ArtifactKind, symbol: &str) -> PathBuf {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        self.root
            .join(date)
            .join(symbol)
            .join(format!("{}.jsonl", kind.file_stem()))
    }
}

#[derive(Serialize)]
struct Record {
    snapshot_id: Uuid,
    #[serde(flatten)]
    payload: serde_json::Value,
}

#[async_trait]
impl SnapshotRepository for JsonLinesRepository {
    async fn append_value(
        &self,
        kind: ArtifactKind,
        symbol: &str,
        snapshot_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<()> {
        let record = Record { snapshot_id, payload };
        let line = serde_json::to_string(&record).context("encoding jsonl record")?;

        let path = self.path_for(kind, symbol);
        let _guard = self.write_lock.lock().expect("persistence lock poisoned");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.context("creating persistence dir")?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("opening {}", path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

/// In-memory test double, mirroring the teacher's `InMemoryTradeRepository`.
#[derive(Default)]
pub struct InMemoryRepository {
    records: Mutex<Vec<(ArtifactKind, String, Uuid, serde_json::Value)>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records_for(&self, kind: ArtifactKind, symbol: &str) -> Vec<serde_json::Value> {
        self.records
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|(k, s, _, _)| *k == kind && s == symbol)
            .map(|(_, _, _, v)| v.clone())
            .collect()
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryRepository {
    async fn append_value(
        &self,
        kind: ArtifactKind,
        symbol: &str,
        snapshot_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<()> {
        self.records
            .lock()
            .expect("lock poisoned")
            .push((kind, symbol.to_string(), snapshot_id, payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Dummy {
        value: i32,
    }

    #[tokio::test]
    async fn in_memory_repository_round_trips() {
        let repo = InMemoryRepository::new();
        let id = Uuid::new_v4();
        append(&repo, ArtifactKind::Decisions, "BTCUSDT", id, &Dummy { value: 42 })
            .await
            .unwrap();
        let records = repo.records_for(ArtifactKind::Decisions, "BTCUSDT");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["value"], 42);
    }
}
