//! JSONL storage for decisions
//!
//! Decisions of every project in a workspace are stored in
//! `.strata/decisions.jsonl` with one JSON object per line. Reads take a
//! shared lock, writes go through a temp file and an atomic rename, and
//! read-modify-write sequences hold an exclusive lock on a sidecar
//! `.lock` file for their whole duration.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{
    Decision, DecisionId, DecisionSet, HierarchyError, NewDecision, ProjectId, StructuralChange,
    Urgency,
};

#[derive(Debug, Error, PartialEq)]
pub enum StorageError {
    #[error("Decision not found: {0}")]
    DecisionNotFound(DecisionId),

    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),
}

/// A JSONL file of serde records
#[derive(Debug, Clone)]
pub(crate) struct JsonlFile {
    path: PathBuf,
}

impl JsonlFile {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Holds an exclusive lock on the sidecar lock file until dropped
    pub(crate) fn lock(&self) -> Result<File> {
        self.ensure_parent()?;
        let lock_path = self.path.with_extension("lock");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to lock {}", self.path.display()))?;

        Ok(file)
    }

    pub(crate) fn read_records<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open store: {}", self.path.display()))?;

        file.lock_shared()
            .with_context(|| format!("Failed to acquire read lock on {}", self.path.display()))?;

        let reader = BufReader::new(&file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let record = serde_json::from_str(&line).with_context(|| {
                format!(
                    "Failed to parse record at {}:{}",
                    self.path.display(),
                    line_num + 1
                )
            })?;
            records.push(record);
        }

        Ok(records)
    }

    /// Rewrites the whole file
    pub(crate) fn write_records<'a, T: Serialize + 'a>(
        &self,
        records: impl IntoIterator<Item = &'a T>,
    ) -> Result<()> {
        self.ensure_parent()?;

        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on temp file")?;

            let mut writer = BufWriter::new(&file);

            for record in records {
                let line = serde_json::to_string(record).context("Failed to serialize record")?;
                writeln!(writer, "{}", line).context("Failed to write record")?;
            }

            writer.flush().context("Failed to flush store")?;
        }

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    pub(crate) fn append_record<T: Serialize>(&self, record: &T) -> Result<()> {
        self.ensure_parent()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open store: {}", self.path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to acquire write lock on {}", self.path.display()))?;

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(record).context("Failed to serialize record")?;
        writeln!(writer, "{}", line).context("Failed to write record")?;

        writer.flush().context("Failed to flush store")?;

        Ok(())
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        Ok(())
    }
}

/// Content edits for a decision. Structural fields go through
/// [`DecisionStore::apply`] instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub urgency: Option<Urgency>,
    pub payload: Vec<(String, serde_json::Value)>,
}

impl DecisionPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.urgency.is_none()
            && self.payload.is_empty()
    }

    fn apply_to(self, decision: &mut Decision) {
        if let Some(title) = self.title {
            decision.set_title(title);
        }
        if let Some(description) = self.description {
            decision.set_description(description);
        }
        if let Some(urgency) = self.urgency {
            decision.set_urgency(urgency);
        }
        for (key, value) in self.payload {
            decision.set_payload(key, value);
        }
    }
}

/// Store for decision records
pub struct DecisionStore {
    file: JsonlFile,
}

impl DecisionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonlFile::new(path),
        }
    }

    /// Creates the default store for a workspace
    pub fn for_workspace(workspace_root: &Path) -> Self {
        Self::new(workspace_root.join(".strata").join("decisions.jsonl"))
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Reads every decision of every project
    ///
    /// A decision id repeated on several lines resolves to its last line.
    pub fn read_all(&self) -> Result<DecisionSet> {
        Ok(self.file.read_records::<Decision>()?.into_iter().collect())
    }

    /// Decisions of one project, in timeline order
    pub fn list_decisions(&self, project_id: &ProjectId) -> Result<Vec<Decision>> {
        Ok(self.snapshot(project_id)?.into_sorted_vec())
    }

    /// Decisions of one project as a set for the engine
    pub fn snapshot(&self, project_id: &ProjectId) -> Result<DecisionSet> {
        Ok(self
            .read_all()?
            .iter()
            .filter(|d| &d.project_id == project_id)
            .cloned()
            .collect())
    }

    pub fn get(&self, id: &DecisionId) -> Result<Option<Decision>> {
        Ok(self.read_all()?.get(id).cloned())
    }

    /// Persists a draft, assigning its id and `created_at`
    ///
    /// `created_at` is strictly greater than that of every decision already
    /// stored for the project, so timeline order follows creation order even
    /// when the clock has not advanced.
    pub fn create(&self, draft: NewDecision) -> Result<Decision> {
        self.create_with(draft, |_, _| Ok(()))
    }

    /// Like [`create`](Self::create), but runs `validate` against the stored
    /// decisions of every project while holding the write lock, so a check
    /// such as a layer cap cannot go stale before the insert.
    pub fn create_with<F>(&self, draft: NewDecision, validate: F) -> Result<Decision>
    where
        F: FnOnce(&DecisionSet, &NewDecision) -> Result<()>,
    {
        let _lock = self.file.lock()?;
        let existing = self.read_all()?;
        validate(&existing, &draft)?;

        let latest = existing
            .iter()
            .filter(|d| d.project_id == draft.project_id)
            .map(|d| d.created_at)
            .max();
        let mut created_at = next_timestamp(Utc::now(), latest);
        let mut id = DecisionId::new(&draft.title, created_at);
        while existing.contains(&id) {
            created_at += Duration::microseconds(1);
            id = DecisionId::new(&draft.title, created_at);
        }

        let decision = Decision::from_draft(draft, id, created_at);
        self.file.append_record(&decision)?;

        tracing::debug!(
            id = %decision.id,
            project = %decision.project_id,
            decision_type = %decision.decision_type,
            root = decision.is_root(),
            "created decision"
        );

        Ok(decision)
    }

    /// Removes a decision; returns false if it was not stored
    pub fn delete(&self, id: &DecisionId) -> Result<bool> {
        let _lock = self.file.lock()?;
        let mut decisions = self.read_all()?.into_sorted_vec();
        let len_before = decisions.len();
        decisions.retain(|d| &d.id != id);

        let removed = decisions.len() != len_before;
        if removed {
            self.file.write_records(&decisions)?;
            tracing::debug!(%id, "deleted decision");
        }
        Ok(removed)
    }

    /// Edits content fields of a decision
    pub fn patch(&self, id: &DecisionId, patch: DecisionPatch) -> Result<Decision> {
        let _lock = self.file.lock()?;
        let mut set = self.read_all()?;

        let decision = set
            .get_mut(id)
            .ok_or_else(|| StorageError::DecisionNotFound(id.clone()))?;
        patch.apply_to(decision);
        let updated = decision.clone();

        self.file.write_records(&set.into_sorted_vec())?;
        tracing::debug!(%id, "patched decision");

        Ok(updated)
    }

    /// Persists a structural change validated by the engine
    pub fn apply(&self, change: &StructuralChange) -> Result<()> {
        let _lock = self.file.lock()?;
        let set = self.read_all()?;

        if !set.contains(change.target()) {
            return Err(StorageError::DecisionNotFound(change.target().clone()).into());
        }

        let next = set.apply(change);
        self.file.write_records(&next.into_sorted_vec())
    }

    /// Plans a structural change against the stored decisions and persists
    /// it, all under the write lock
    ///
    /// Returns the change that was written, or `None` if the plan was a
    /// no-op. A planning error leaves the store untouched.
    pub fn mutate<F>(&self, plan: F) -> Result<Option<StructuralChange>>
    where
        F: FnOnce(&DecisionSet) -> Result<Option<StructuralChange>, HierarchyError>,
    {
        let _lock = self.file.lock()?;
        let set = self.read_all()?;

        let change = plan(&set)?;
        if let Some(change) = &change {
            let next = set.apply(change);
            self.file.write_records(&next.into_sorted_vec())?;
        }

        Ok(change)
    }

    /// Rewrites the store clean, dropping superseded lines
    pub fn compact(&self) -> Result<usize> {
        let _lock = self.file.lock()?;
        let decisions = self.read_all()?.into_sorted_vec();
        self.file.write_records(&decisions)?;
        Ok(decisions.len())
    }
}

/// First timestamp after `latest`, preferring `now`
fn next_timestamp(now: DateTime<Utc>, latest: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match latest {
        Some(latest) if latest >= now => latest + Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DecisionType;
    use tempfile::TempDir;

    fn project() -> ProjectId {
        "p-0000001".parse().unwrap()
    }

    fn store(dir: &TempDir) -> DecisionStore {
        DecisionStore::new(dir.path().join("decisions.jsonl"))
    }

    #[test]
    fn read_empty_store() {
        let dir = TempDir::new().unwrap();

        assert!(store(&dir).read_all().unwrap().is_empty());
    }

    #[test]
    fn create_assigns_id_and_monotonic_timestamps() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let first = store
            .create(NewDecision::new(project(), DecisionType::Scope, "First"))
            .unwrap();
        let second = store
            .create(NewDecision::new(project(), DecisionType::Scope, "Second"))
            .unwrap();
        let third = store
            .create(NewDecision::new(project(), DecisionType::Scope, "Third"))
            .unwrap();

        assert!(first.created_at < second.created_at);
        assert!(second.created_at < third.created_at);
        assert_ne!(first.id, second.id);

        let listed: Vec<_> = store
            .list_decisions(&project())
            .unwrap()
            .into_iter()
            .map(|d| d.title)
            .collect();
        assert_eq!(listed, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn next_timestamp_bumps_past_latest() {
        let now = Utc::now();

        assert_eq!(next_timestamp(now, None), now);
        assert_eq!(next_timestamp(now, Some(now - Duration::seconds(1))), now);
        assert_eq!(
            next_timestamp(now, Some(now)),
            now + Duration::microseconds(1)
        );
        assert_eq!(
            next_timestamp(now, Some(now + Duration::seconds(5))),
            now + Duration::seconds(5) + Duration::microseconds(1)
        );
    }

    #[test]
    fn list_is_scoped_to_project() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let other: ProjectId = "p-0000002".parse().unwrap();

        store
            .create(NewDecision::new(project(), DecisionType::Focus, "Mine"))
            .unwrap();
        store
            .create(NewDecision::new(other.clone(), DecisionType::Focus, "Theirs"))
            .unwrap();

        assert_eq!(store.list_decisions(&project()).unwrap().len(), 1);
        assert_eq!(store.list_decisions(&other).unwrap()[0].title, "Theirs");
        assert_eq!(store.read_all().unwrap().len(), 2);
    }

    #[test]
    fn patch_edits_content() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let decision = store
            .create(NewDecision::new(project(), DecisionType::Focus, "Draft"))
            .unwrap();

        let patched = store
            .patch(
                &decision.id,
                DecisionPatch {
                    title: Some("Final".to_string()),
                    urgency: Some(Urgency::Critical),
                    payload: vec![("region".to_string(), serde_json::json!("delta"))],
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(patched.title, "Final");
        assert_eq!(patched.created_at, decision.created_at);

        let loaded = store.get(&decision.id).unwrap().unwrap();
        assert_eq!(loaded.urgency, Urgency::Critical);
        assert_eq!(loaded.payload.get("region"), Some(&serde_json::json!("delta")));
    }

    #[test]
    fn patch_missing_decision_fails() {
        let dir = TempDir::new().unwrap();
        let missing: DecisionId = "d-fffffff".parse().unwrap();

        let err = store(&dir)
            .patch(&missing, DecisionPatch::default())
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<StorageError>(),
            Some(&StorageError::DecisionNotFound(missing))
        );
    }

    #[test]
    fn apply_persists_validated_changes() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let root = store
            .create(NewDecision::new(project(), DecisionType::Focus, "Root"))
            .unwrap();
        let child = store
            .create(
                NewDecision::new(project(), DecisionType::Focus, "Child")
                    .with_parent(root.id.clone()),
            )
            .unwrap();

        let snapshot = store.snapshot(&project()).unwrap();
        assert!(matches!(
            snapshot.plan_delete(&root.id),
            Err(HierarchyError::HasChildren { .. })
        ));

        let change = snapshot.plan_promote(&child.id).unwrap().unwrap();
        store.apply(&change).unwrap();
        assert!(store.get(&child.id).unwrap().unwrap().is_root());

        let change = store.snapshot(&project()).unwrap().plan_delete(&root.id).unwrap();
        store.apply(&change).unwrap();
        assert!(store.get(&root.id).unwrap().is_none());
    }

    #[test]
    fn mutate_writes_nothing_when_planning_fails() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let root = store
            .create(NewDecision::new(project(), DecisionType::Focus, "Root"))
            .unwrap();
        let child = store
            .create(
                NewDecision::new(project(), DecisionType::Focus, "Child")
                    .with_parent(root.id.clone()),
            )
            .unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        let err = store
            .mutate(|set| set.plan_reparent(&root.id, &child.id))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<HierarchyError>(),
            Some(HierarchyError::Cycle { .. })
        ));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn create_with_rejects_inside_the_lock() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let result = store.create_with(
            NewDecision::new(project(), DecisionType::Focus, "Refused"),
            |existing, _| {
                assert!(existing.is_empty());
                anyhow::bail!("refused")
            },
        );

        assert!(result.is_err());
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn delete_reports_whether_removed() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let decision = store
            .create(NewDecision::new(project(), DecisionType::Scope, "Gone"))
            .unwrap();

        assert!(store.delete(&decision.id).unwrap());
        assert!(!store.delete(&decision.id).unwrap());
    }

    #[test]
    fn compact_keeps_last_line_per_id() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut decision = store
            .create(NewDecision::new(project(), DecisionType::Scope, "Old title"))
            .unwrap();

        decision.set_title("New title");
        store.file.append_record(&decision).unwrap();

        assert_eq!(store.compact().unwrap(), 1);
        assert_eq!(store.get(&decision.id).unwrap().unwrap().title, "New title");
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store
            .create(NewDecision::new(project(), DecisionType::Scope, "One"))
            .unwrap();
        store.compact().unwrap();

        assert!(!store.path().with_extension("jsonl.tmp").exists());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = DecisionStore::new(dir.path().join("nested").join("decisions.jsonl"));

        store
            .create(NewDecision::new(project(), DecisionType::Focus, "Nested"))
            .unwrap();
        assert!(store.path().exists());
    }
}
