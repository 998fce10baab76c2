mod common;

use capri_core::{DuplicatePolicy, EntityService, ServiceError};
use common::{memory_factory, row_count, Person};

#[test]
fn lifecycle_create_read_update_delete() {
    let service = EntityService::<Person>::new(memory_factory());

    let created = service.create(Person::new(1, "a")).unwrap();
    assert_eq!(created, Person::new(1, "a"));
    assert_eq!(service.get_by_id(&1).unwrap(), Some(Person::new(1, "a")));

    let updated = service.update(Person::new(1, "b")).unwrap();
    assert_eq!(updated, Person::new(1, "b"));
    assert_eq!(service.get_by_id(&1).unwrap(), Some(Person::new(1, "b")));

    assert!(service.delete(&1).unwrap());
    assert_eq!(service.get_by_id(&1).unwrap(), None);
}

#[test]
fn get_by_id_on_missing_key_is_not_found_not_error() {
    let service = EntityService::<Person>::new(memory_factory());
    assert_eq!(service.get_by_id(&404).unwrap(), None);
}

#[test]
fn get_all_on_empty_store_returns_empty_vec() {
    let service = EntityService::<Person>::new(memory_factory());
    assert!(service.get_all().unwrap().is_empty());
}

#[test]
fn get_all_returns_every_record_ordered_by_key() {
    let service = EntityService::<Person>::new(memory_factory());
    service.create(Person::new(3, "c")).unwrap();
    service.create(Person::new(1, "a")).unwrap();
    service.create(Person::new(2, "b").with_email("b@example.com")).unwrap();

    let all = service.get_all().unwrap();
    let ids: Vec<i64> = all.iter().map(|person| person.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(all[1].email.as_deref(), Some("b@example.com"));
}

#[test]
fn create_twice_with_same_identity_is_idempotent() {
    let factory = memory_factory();
    let service = EntityService::<Person>::new(factory.clone());

    service.create(Person::new(7, "original")).unwrap();
    let second = service.create(Person::new(7, "changed")).unwrap();

    // The input comes back unchanged and storage keeps the first write.
    assert_eq!(second, Person::new(7, "changed"));
    assert_eq!(service.get_by_id(&7).unwrap(), Some(Person::new(7, "original")));
    assert_eq!(row_count(&factory), 1);
}

#[test]
fn reject_policy_reports_duplicates() {
    let service = EntityService::<Person>::new(memory_factory())
        .with_duplicate_policy(DuplicatePolicy::Reject);
    assert_eq!(service.duplicate_policy(), DuplicatePolicy::Reject);

    service.create(Person::new(5, "first")).unwrap();
    let err = service.create(Person::new(5, "second")).unwrap_err();
    match err {
        ServiceError::Duplicate { entity, key } => {
            assert_eq!(entity, "Person");
            assert_eq!(key, "5");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(service.get_by_id(&5).unwrap(), Some(Person::new(5, "first")));
}

#[test]
fn update_of_unknown_key_creates_record() {
    let factory = memory_factory();
    let service = EntityService::<Person>::new(factory.clone());

    let merged = service.update(Person::new(42, "new")).unwrap();
    assert_eq!(merged, Person::new(42, "new"));
    assert_eq!(service.get_by_id(&42).unwrap(), Some(Person::new(42, "new")));
    assert_eq!(row_count(&factory), 1);
}

#[test]
fn update_clears_optional_columns() {
    let service = EntityService::<Person>::new(memory_factory());
    service
        .create(Person::new(9, "mail").with_email("m@example.com"))
        .unwrap();

    let merged = service.update(Person::new(9, "mail")).unwrap();
    assert_eq!(merged.email, None);
}

#[test]
fn delete_on_absent_key_returns_false_and_leaves_storage_unchanged() {
    let factory = memory_factory();
    let service = EntityService::<Person>::new(factory.clone());
    service.create(Person::new(1, "kept")).unwrap();

    assert!(!service.delete(&2).unwrap());
    assert_eq!(row_count(&factory), 1);
    assert_eq!(service.get_all().unwrap(), vec![Person::new(1, "kept")]);
}

#[test]
fn services_on_same_factory_share_storage() {
    let factory = memory_factory();
    let writer = EntityService::<Person>::new(factory.clone());
    let reader = writer.clone();

    writer.create(Person::new(1, "shared")).unwrap();
    assert_eq!(reader.get_by_id(&1).unwrap(), Some(Person::new(1, "shared")));
    assert_eq!(reader.factory().unit_name(), "test");
}
