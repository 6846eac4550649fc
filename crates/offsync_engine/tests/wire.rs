//! Full sync through the HTTP wire format and the row server.

use offsync_core::{ManualClock, NewAccount, NewPet, PetPatch, SyncStatus, Table};
use offsync_remote::MemoryRemote;
use offsync_testkit::{start_time, wire_engine};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn two_devices_converge_through_the_server() {
    let rows = Arc::new(MemoryRemote::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let phone = wire_engine(Arc::clone(&rows), Arc::clone(&clock));
    let tablet = wire_engine(Arc::clone(&rows), Arc::clone(&clock));

    let owner = phone.create_account(NewAccount::new("alice", "h")).unwrap();
    let rex = phone.create_pet(owner, NewPet::new("Rex", "dog")).unwrap();
    let report = phone.sync_now(owner).unwrap();
    assert_eq!(report.summary(), "pushed 2, pulled 0");

    let pulled = tablet.sync_now(owner).unwrap();
    assert_eq!(pulled.pulled[&Table::Pets], 1);
    assert_eq!(tablet.get_pet(rex).unwrap().sync_status, SyncStatus::Synced);

    clock.advance(Duration::from_secs(10));
    tablet
        .update_pet(rex, &PetPatch::new().notes("allergic to chicken"))
        .unwrap();
    assert_eq!(tablet.get_pet(rex).unwrap().sync_status, SyncStatus::Synced);

    let report = phone.sync_now(owner).unwrap();
    assert_eq!(report.pulled[&Table::Pets], 1);
    assert_eq!(
        phone.get_pet(rex).unwrap().pet().unwrap().notes,
        "allergic to chicken"
    );
}

#[test]
fn duplicate_username_rejected_by_server() {
    let rows = Arc::new(MemoryRemote::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let phone = wire_engine(Arc::clone(&rows), Arc::clone(&clock));
    let laptop = wire_engine(Arc::clone(&rows), clock);

    let first = phone.create_account(NewAccount::new("alice", "h")).unwrap();
    phone.sync_now(first).unwrap();

    let second = laptop.create_account(NewAccount::new("alice", "h")).unwrap();
    let report = laptop.sync_now(second).unwrap();
    assert!(report.is_online);
    assert_eq!(report.pushed[&Table::Users], 0);
    assert_eq!(laptop.sync_status().pending_for(Table::Users), 1);
}

#[test]
fn server_outage_reports_offline() {
    let rows = Arc::new(MemoryRemote::new());
    let engine = wire_engine(Arc::clone(&rows), Arc::new(ManualClock::new(start_time())));
    let owner = engine.create_account(NewAccount::new("alice", "h")).unwrap();

    rows.set_reachable(false);
    let report = engine.sync_now(owner).unwrap();
    assert!(!report.is_online);
    assert_eq!(report.summary(), "offline, changes saved locally");
    assert_eq!(engine.sync_status().total_pending, 1);
}
