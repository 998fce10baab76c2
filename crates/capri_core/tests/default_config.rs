mod common;

use capri_core::{configure, configured_unit, EntityService, ServiceError, CONFIG_PATH_ENV};
use common::{Person, PEOPLE_DDL};

// Mutates the process environment; kept alone in its own test binary.
#[test]
fn configure_resolves_unit_from_config_file_named_by_environment() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("capri.db");
    let config_path = dir.path().join("persistence.toml");
    std::fs::write(
        &config_path,
        format!(
            "[[unit]]\nname = \"pubdta\"\ndatabase = {:?}\nschema = [{:?}]\n",
            db_path.to_str().unwrap(),
            PEOPLE_DDL
        ),
    )
    .unwrap();

    std::env::set_var(CONFIG_PATH_ENV, dir.path().join("absent.toml"));
    assert!(matches!(
        configure("pubdta"),
        Err(ServiceError::Config(capri_core::ConfigError::Io { .. }))
    ));

    std::env::set_var(CONFIG_PATH_ENV, &config_path);
    assert!(matches!(
        configure("unknown"),
        Err(ServiceError::Config(capri_core::ConfigError::UnknownUnit(_)))
    ));
    configure("pubdta").unwrap();
    assert_eq!(configured_unit().as_deref(), Some("pubdta"));
    assert!(matches!(
        configure("pubdta"),
        Err(ServiceError::AlreadyConfigured { .. })
    ));

    let service = EntityService::<Person>::from_global().unwrap();
    service.create(Person::new(10, "from file")).unwrap();
    assert_eq!(service.get_all().unwrap(), vec![Person::new(10, "from file")]);
    assert!(db_path.exists());
}
