//! The HTTP remote against the row server, end to end through the wire format.

use chrono::Utc;
use offsync_core::{AccountFields, PetFields, Record, RecordId, SyncStatus, Table};
use offsync_remote::{
    HttpRemote, LoopbackClient, MemoryRemote, RemoteConnector, RemoteError, RemoteSettings,
    RemoteStore, RowServer,
};
use std::sync::Arc;

type LoopbackRemote = HttpRemote<LoopbackClient<RowServer>>;

fn setup(token: &str) -> (Arc<MemoryRemote>, RemoteConnector<LoopbackRemote>) {
    let rows = Arc::new(MemoryRemote::new());
    let server = RowServer::new(Arc::clone(&rows), "secret");
    let remote = HttpRemote::new("http://rows.test", token, LoopbackClient::new(server));
    let connector = RemoteConnector::new(RemoteSettings::new("http://rows.test", token), remote);
    (rows, connector)
}

fn account(name: &str) -> Record {
    Record::new_account(
        AccountFields {
            username: name.into(),
            password_hash: "h".into(),
        },
        Utc::now(),
    )
}

#[test]
fn rows_round_trip_over_the_wire() {
    let (rows, connector) = setup("secret");
    assert!(connector.connect());

    let alice = account("alice");
    let pet = Record::new_pet(alice.id, PetFields::new("Rex", "dog"), Utc::now());
    connector.upsert_remote(Table::Users, &alice).unwrap();
    connector.upsert_remote(Table::Pets, &pet).unwrap();

    let stored = rows.row(Table::Pets, pet.id).unwrap();
    assert_eq!(stored.sync_status, SyncStatus::Synced);
    assert!(stored.same_content(&pet));

    let fetched = connector.fetch_all(Table::Pets, alice.id).unwrap();
    assert_eq!(fetched.len(), 1);
    assert!(fetched[0].same_content(&pet));
    assert!(connector.fetch_all(Table::Pets, RecordId::new()).unwrap().is_empty());
}

#[test]
fn wrong_credential_never_connects() {
    let (_rows, connector) = setup("not-the-secret");
    assert!(!connector.connect());
    assert!(!connector.is_available());
}

#[test]
fn constraint_violation_is_rejected() {
    let (_rows, connector) = setup("secret");
    connector.connect();

    connector.upsert_remote(Table::Users, &account("bob")).unwrap();
    let err = connector.upsert_remote(Table::Users, &account("bob")).unwrap_err();
    assert!(matches!(err, RemoteError::Rejected(_)));
    assert!(connector.is_available());
}

#[test]
fn remote_outage_maps_to_unavailable() {
    let (rows, connector) = setup("secret");
    connector.connect();

    rows.set_reachable(false);
    let pet = Record::new_pet(RecordId::new(), PetFields::new("Rex", "dog"), Utc::now());
    let err = connector.upsert_remote(Table::Pets, &pet).unwrap_err();
    assert!(err.is_connectivity());
    assert!(!connector.is_available());
    assert!(!connector.connect());
}

#[test]
fn cut_network_maps_to_unavailable() {
    let rows = Arc::new(MemoryRemote::new());
    let remote = HttpRemote::new(
        "http://rows.test",
        "secret",
        LoopbackClient::new(RowServer::new(Arc::clone(&rows), "secret")),
    );
    remote.ping().unwrap();

    remote.client().set_reachable(false);
    assert!(remote.ping().unwrap_err().is_connectivity());
    assert_eq!(remote.client().server().rows().write_count(), 0);
}
