use std::{fs, path::PathBuf, sync::Arc};

use uuid::Uuid;

use reckoner::{
    persistence::JsonlBanTable,
    reputation::{ReputationEntry, ReputationStore, ResetOutcome},
};

struct TempTable {
    dir: PathBuf,
    path: PathBuf,
}

impl TempTable {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("reckoner-reputation-test-{}", Uuid::now_v7()));
        fs::create_dir_all(&dir).expect("temp dir should exist");
        let path = dir.join("bans.jsonl");
        Self { dir, path }
    }

    fn store(&self) -> ReputationStore {
        let table = Arc::new(JsonlBanTable::open(self.path.clone()));
        ReputationStore::recover(table).expect("reputation should recover")
    }
}

impl Drop for TempTable {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

#[test]
fn given_double_ban_then_single_entry_remains() {
    let table = TempTable::new();
    let store = table.store();

    store
        .ban(ReputationEntry::new("prov-1", "provider one", "failed to deliver work"))
        .expect("ban should persist");
    store
        .ban(ReputationEntry::new("prov-1", "provider one", "failed to deliver work"))
        .expect("duplicate ban should be a no-op");

    assert_eq!(store.count(), 1);
    assert!(store.is_banned("prov-1"));

    // Only one line made it to the table as well.
    let reloaded = table.store();
    assert_eq!(reloaded.count(), 1);
}

#[test]
fn given_empty_store_when_reset_then_nothing_to_reset() {
    let table = TempTable::new();
    let store = table.store();

    assert_eq!(
        store.reset().expect("reset should succeed"),
        ResetOutcome::NothingToReset
    );
}

#[test]
fn given_banned_providers_when_reset_then_store_and_table_are_empty() {
    let table = TempTable::new();
    let store = table.store();
    store
        .ban(ReputationEntry::new("prov-1", "provider one", "failed to deliver work"))
        .expect("ban should persist");
    store
        .ban(ReputationEntry::new("prov-2", "provider two", "failed to deliver work"))
        .expect("ban should persist");

    assert_eq!(
        store.reset().expect("reset should succeed"),
        ResetOutcome::Cleared { removed: 2 }
    );
    assert!(!store.is_banned("prov-1"));
    assert_eq!(store.count(), 0);

    let reloaded = table.store();
    assert_eq!(reloaded.count(), 0);
}

#[test]
fn given_persisted_bans_when_recovered_then_entries_are_restored_in_order() {
    let table = TempTable::new();
    {
        let store = table.store();
        store
            .ban(ReputationEntry::new("prov-2", "provider two", "failed to deliver work"))
            .expect("ban should persist");
        store
            .ban(ReputationEntry::new("prov-1", "provider one", "failed to deliver work"))
            .expect("ban should persist");
    }

    let recovered = table.store();
    assert!(recovered.is_banned("prov-1"));
    assert!(recovered.is_banned("prov-2"));
    let ids: Vec<String> = recovered
        .list()
        .into_iter()
        .map(|entry| entry.provider_id)
        .collect();
    assert_eq!(ids, vec!["prov-2".to_string(), "prov-1".to_string()]);
}
