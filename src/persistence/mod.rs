use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};

use crate::{
    gateway::{
        error::{ReconcileError, persistence_failure},
        ports::{BanStore, DecisionStore},
        types::{ClaimId, ReconciliationDecision},
    },
    reputation::types::ReputationEntry,
};

/// Append-only JSON-lines decision log. One `decision` line per claim id plus
/// a `settled` marker line once settlement completed; replaying the file
/// reconstructs the in-memory index after a restart.
pub struct JsonlDecisionLog {
    path: PathBuf,
    index: Mutex<HashMap<ClaimId, ReconciliationDecision>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DecisionLogLine {
    Decision { decision: ReconciliationDecision },
    Settled { claim_id: ClaimId },
}

impl JsonlDecisionLog {
    pub fn open(path: PathBuf) -> Result<Self, ReconcileError> {
        let mut index = HashMap::new();
        match fs::read_to_string(&path) {
            Ok(content) => {
                for (line_no, line) in content.lines().enumerate() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let parsed: DecisionLogLine = serde_json::from_str(line).map_err(|err| {
                        persistence_failure(format!(
                            "corrupt decision log '{}' at line {}: {err}",
                            path.display(),
                            line_no + 1
                        ))
                    })?;
                    match parsed {
                        DecisionLogLine::Decision { decision } => {
                            index.insert(decision.claim_id.clone(), decision);
                        }
                        DecisionLogLine::Settled { claim_id } => {
                            if let Some(decision) = index.get_mut(&claim_id) {
                                decision.settled = true;
                            }
                        }
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(persistence_failure(format!(
                    "failed to read decision log '{}': {err}",
                    path.display()
                )));
            }
        }

        Ok(Self {
            path,
            index: Mutex::new(index),
        })
    }

    pub fn decided_count(&self) -> usize {
        self.lock_index().len()
    }

    fn append_line(&self, line: &DecisionLogLine) -> Result<(), ReconcileError> {
        append_json_line(&self.path, line)
    }

    fn lock_index(&self) -> std::sync::MutexGuard<'_, HashMap<ClaimId, ReconciliationDecision>> {
        match self.index.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl DecisionStore for JsonlDecisionLog {
    fn record(&self, decision: &ReconciliationDecision) -> Result<(), ReconcileError> {
        let mut index = self.lock_index();
        self.append_line(&DecisionLogLine::Decision {
            decision: decision.clone(),
        })?;
        index.insert(decision.claim_id.clone(), decision.clone());
        Ok(())
    }

    fn mark_settled(&self, claim_id: &str) -> Result<(), ReconcileError> {
        let mut index = self.lock_index();
        self.append_line(&DecisionLogLine::Settled {
            claim_id: claim_id.to_string(),
        })?;
        if let Some(decision) = index.get_mut(claim_id) {
            decision.settled = true;
        }
        Ok(())
    }

    fn find(&self, claim_id: &str) -> Option<ReconciliationDecision> {
        self.lock_index().get(claim_id).cloned()
    }
}

/// One JSON line per banned provider. `clear` truncates the table atomically
/// through a temp-file rename so a crash mid-reset cannot leave a partial
/// table behind.
pub struct JsonlBanTable {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlBanTable {
    pub fn open(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }
}

impl BanStore for JsonlBanTable {
    fn append(&self, entry: &ReputationEntry) -> Result<(), ReconcileError> {
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        append_json_line(&self.path, entry)
    }

    fn clear(&self) -> Result<(), ReconcileError> {
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, b"").map_err(|err| {
            persistence_failure(format!(
                "failed to stage ban table reset '{}': {err}",
                tmp_path.display()
            ))
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|err| {
            persistence_failure(format!(
                "failed to reset ban table '{}': {err}",
                self.path.display()
            ))
        })
    }

    fn load(&self) -> Result<Vec<ReputationEntry>, ReconcileError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(persistence_failure(format!(
                    "failed to read ban table '{}': {err}",
                    self.path.display()
                )));
            }
        };

        let mut entries = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry: ReputationEntry = serde_json::from_str(line).map_err(|err| {
                persistence_failure(format!(
                    "corrupt ban table '{}' at line {}: {err}",
                    self.path.display(),
                    line_no + 1
                ))
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

fn append_json_line<T: Serialize>(path: &Path, value: &T) -> Result<(), ReconcileError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|err| {
            persistence_failure(format!(
                "failed to create directory '{}': {err}",
                parent.display()
            ))
        })?;
    }

    let mut line = serde_json::to_string(value)
        .map_err(|err| persistence_failure(format!("failed to serialize log line: {err}")))?;
    line.push('\n');

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| {
            persistence_failure(format!("failed to open '{}': {err}", path.display()))
        })?;
    file.write_all(line.as_bytes()).map_err(|err| {
        persistence_failure(format!("failed to append to '{}': {err}", path.display()))
    })?;
    file.sync_data().map_err(|err| {
        persistence_failure(format!("failed to sync '{}': {err}", path.display()))
    })
}
