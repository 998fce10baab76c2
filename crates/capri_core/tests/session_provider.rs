mod common;

use capri_core::db::query::select_all;
use capri_core::{DbError, TransactionMode};
use common::{memory_factory, row_count, Person};

#[test]
fn transaction_state_follows_begin_commit_and_rollback() {
    let factory = memory_factory();
    let mut session = factory.open_session().unwrap();
    assert!(session.is_open());
    assert!(!session.is_active());

    session.begin(TransactionMode::Write).unwrap();
    assert!(session.is_active());
    assert!(matches!(
        session.begin(TransactionMode::Read),
        Err(DbError::TransactionAlreadyActive)
    ));

    session.persist(&Person::new(1, "a")).unwrap();
    session.commit().unwrap();
    assert!(!session.is_active());
    assert!(matches!(session.commit(), Err(DbError::NoActiveTransaction)));
    assert!(matches!(session.rollback(), Err(DbError::NoActiveTransaction)));
    session.close();

    assert_eq!(row_count(&factory), 1);
}

#[test]
fn rollback_discards_pending_writes() {
    let factory = memory_factory();
    let mut session = factory.open_session().unwrap();

    session.begin(TransactionMode::Write).unwrap();
    session.persist(&Person::new(1, "gone")).unwrap();
    assert!(session.contains(&Person::new(1, "gone")).unwrap());
    session.rollback().unwrap();
    session.close();

    assert_eq!(row_count(&factory), 0);
}

#[test]
fn dropping_session_with_active_transaction_rolls_back() {
    let factory = memory_factory();
    {
        let mut session = factory.open_session().unwrap();
        session.begin(TransactionMode::Write).unwrap();
        session.persist(&Person::new(1, "dropped")).unwrap();
    }

    assert_eq!(row_count(&factory), 0);
}

#[test]
fn persist_rejects_existing_key_while_merge_upserts() {
    let factory = memory_factory();
    let mut session = factory.open_session().unwrap();
    session.begin(TransactionMode::Write).unwrap();

    session.persist(&Person::new(1, "a")).unwrap();
    assert!(matches!(
        session.persist(&Person::new(1, "again")),
        Err(DbError::Sqlite(_))
    ));

    let merged = session.merge(&Person::new(1, "merged")).unwrap();
    assert_eq!(merged, Person::new(1, "merged"));
    let inserted = session.merge(&Person::new(2, "fresh")).unwrap();
    assert_eq!(inserted, Person::new(2, "fresh"));

    session.commit().unwrap();
    session.close();
    assert_eq!(row_count(&factory), 2);
}

#[test]
fn find_remove_and_query_round_through_entity_mapping() {
    let factory = memory_factory();
    let mut session = factory.open_session().unwrap();
    session.begin(TransactionMode::Write).unwrap();

    session
        .persist(&Person::new(2, "b").with_email("b@example.com"))
        .unwrap();
    session.persist(&Person::new(1, "a")).unwrap();

    assert_eq!(
        session.find::<Person>(&2).unwrap(),
        Some(Person::new(2, "b").with_email("b@example.com"))
    );
    assert_eq!(session.find::<Person>(&3).unwrap(), None);

    let all = session.query::<Person>(&select_all::<Person>()).unwrap();
    assert_eq!(all, vec![Person::new(1, "a"), Person::new(2, "b").with_email("b@example.com")]);

    assert!(session.remove::<Person>(&1).unwrap());
    assert!(!session.remove::<Person>(&1).unwrap());
    assert!(!session.contains_key::<Person>(&1).unwrap());

    session.commit().unwrap();
}

#[test]
fn query_rejects_foreign_type_names() {
    let factory = memory_factory();
    let session = factory.open_session().unwrap();

    assert!(matches!(
        session.query::<Person>("SELECT e FROM Invoice e"),
        Err(DbError::InvalidQuery(_))
    ));
}
