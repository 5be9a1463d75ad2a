//! End-to-end runs of the dispatcher over a durable world state.

use recledger_core::{Dispatcher, ErrorKind, Invocation, LedgerLayout, SeedPolicy};
use recledger_store::{DurableWorldState, StorageConfig, SyncMode};
use serde_json::Value;

fn storage(dir: &tempfile::TempDir) -> StorageConfig {
    StorageConfig {
        data_dir: dir.path().join("state"),
        sync_mode: SyncMode::EveryWrite,
        ..StorageConfig::default()
    }
}

fn call(dispatcher: &Dispatcher<'_, DurableWorldState>, function: &str, args: &[&str]) -> Value {
    dispatcher
        .invoke(&Invocation::new(function, args.iter().copied()))
        .into_result()
        .unwrap_or_else(|e| panic!("{function} failed: {e}"))
}

#[test]
fn seed_query_update_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = storage(&dir);
    let layout = LedgerLayout::default();

    let before = {
        let state = DurableWorldState::open(&config).unwrap();
        let d = Dispatcher::new(&state, &layout);

        let report = call(&d, "InitLedger", &[]);
        assert_eq!(report["seeded"], 6);
        assert_eq!(report["skipped"], false);

        let third = call(&d, "QueryRecord", &["REC2"]);
        assert_eq!(third["ID"], "3");
        assert_eq!(third["Name"], "Christo");

        let all = call(&d, "QueryAllRecords", &[]);
        let all = all.as_array().unwrap();
        assert_eq!(all.len(), 6);
        let keys: Vec<&str> = all.iter().map(|r| r["Key"].as_str().unwrap()).collect();
        assert_eq!(
            keys,
            vec!["REC0000", "REC0001", "REC0002", "REC0003", "REC0004", "REC0005"]
        );
        assert_eq!(all[0]["Record"]["Name"], "Siva");

        let before = call(&d, "QueryRecord", &["REC0"]);
        assert!(call(&d, "ChangeRecordOwner", &["REC0", "Dana"]).is_null());
        before
    };

    let state = DurableWorldState::open(&config).unwrap();
    assert_eq!(state.len().unwrap(), 6);
    let d = Dispatcher::new(&state, &layout);

    let after = call(&d, "QueryRecord", &["REC0000"]);
    assert_eq!(after["Owner"], "Dana");
    for (field, value) in before.as_object().unwrap() {
        if field != "Owner" {
            assert_eq!(&after[field], value, "{field} changed");
        }
    }

    let report = call(&d, "InitLedger", &[]);
    assert_eq!(report["skipped"], true);
    assert_eq!(call(&d, "QueryRecord", &["0"])["Owner"], "Dana");
}

#[test]
fn failed_invocations_leave_the_log_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let config = storage(&dir);
    let layout = LedgerLayout::default();

    {
        let state = DurableWorldState::open(&config).unwrap();
        let d = Dispatcher::new(&state, &layout);
        call(&d, "InitLedger", &[]);

        let response = d.invoke(&Invocation::new("ChangeRecordField", ["REC1", "Name", "x"]));
        assert_eq!(response.error().unwrap().kind, ErrorKind::ImmutableField);

        let response = d.invoke(&Invocation::new("QueryRecord", ["REC9"]));
        let error = response.error().unwrap();
        assert_eq!(error.kind, ErrorKind::NotFound);
        assert_eq!(error.key.as_deref(), Some("REC0009"));
        assert_eq!(state.last_seq().unwrap(), 1);
    }

    let state = DurableWorldState::open(&config).unwrap();
    assert_eq!(state.last_seq().unwrap(), 1);
    let d = Dispatcher::new(&state, &layout);
    assert_eq!(call(&d, "QueryRecord", &["REC1"])["Name"], "Smith");
}

#[test]
fn overwrite_policy_reseeds_after_compaction() {
    let dir = tempfile::tempdir().unwrap();
    let config = storage(&dir);
    let layout = LedgerLayout::default();

    {
        let state = DurableWorldState::open(&config).unwrap();
        let d = Dispatcher::new(&state, &layout);
        call(&d, "InitLedger", &[]);
        call(&d, "ChangeRecordField", &["REC3", "Stage", "Won"]);
        state.compact().unwrap();

        let d = Dispatcher::new(&state, &layout)
            .with_seed(recledger_core::default_records(), SeedPolicy::Overwrite);
        let report = call(&d, "InitLedger", &[]);
        assert_eq!(report["seeded"], 6);
    }

    let state = DurableWorldState::open(&config).unwrap();
    let d = Dispatcher::new(&state, &layout);
    assert_eq!(call(&d, "QueryRecord", &["REC3"])["Stage"], "Four");
}
