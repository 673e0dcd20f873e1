use crate::fixtures::TestFixture;
use pretty_assertions::assert_eq;
use sshy::config::FixedProvider;
use sshy::{Format, Server, SettingsStore};

#[test]
fn test_json_global_makes_local_json_preferred() {
    let fixture = TestFixture::new().expect("Failed to create fixture");
    fixture
        .with_file("config.json", r#"{"servers_path": "servers.json", "config_path": "."}"#)
        .expect("Failed to write config.json");
    let store = fixture.store();

    assert_eq!(store.preferred_format().expect("preferred_format"), Format::Json);

    let mut local = store.load_local().expect("Failed to load local settings");
    local.upsert_private("lab", Server::new("lab", "lab.local"));
    let path = store.save_local(&local).expect("Failed to save local settings");

    assert_eq!(path, fixture.settings.join("local.json"));
    let written = fixture.read("local.json").expect("Failed to read local.json");
    assert!(written.trim_start().starts_with('{'));
    assert!(!fixture.settings.join("local.yaml").exists());
}

#[test]
fn test_existing_local_yaml_keeps_its_format() {
    let fixture = TestFixture::new().expect("Failed to create fixture");
    fixture.with_file("config.json", "{}").expect("Failed to write config.json");
    fixture.with_file("local.yaml", "private: []\n").expect("Failed to write local.yaml");
    let store = fixture.store();

    let mut local = store.load_local().expect("Failed to load local settings");
    local.upsert_private("lab", Server::new("lab", "lab.local"));
    let path = store.save_local(&local).expect("Failed to save local settings");

    assert_eq!(path, fixture.settings.join("local.yaml"));
    let reloaded = store.load_local().expect("Failed to reload local settings");
    assert_eq!(reloaded.private.len(), 1);
}

#[test]
fn test_servers_key_is_read_as_overrides() {
    let fixture = TestFixture::new().expect("Failed to create fixture");
    fixture
        .with_file("local.yaml", "servers:\n  web:\n    user: admin\n")
        .expect("Failed to write local.yaml");

    let local = fixture.store().load_local().expect("Failed to load local settings");
    assert_eq!(local.overrides["web"].user, "admin");
}

#[test]
fn test_empty_local_file_is_empty_layer() {
    let fixture = TestFixture::new().expect("Failed to create fixture");
    fixture
        .with_file("local.yaml", "# nothing configured yet\n")
        .expect("Failed to write local.yaml");

    let local = fixture.store().load_local().expect("comment-only file should load");
    assert!(local.overrides.is_empty());
    assert!(local.private.is_empty());
}

#[test]
fn test_malformed_global_settings_is_an_error() {
    let fixture = TestFixture::new().expect("Failed to create fixture");
    fixture.with_file("config.yaml", "servers_path: [unclosed\n").expect("Failed to write");

    assert!(fixture.store().load_global().is_err());
}

#[test]
fn test_custom_settings_dir_and_home_expansion() {
    let fixture = TestFixture::new().expect("Failed to create fixture");
    let custom = fixture.temp.path().join("elsewhere");
    let store = SettingsStore::new(FixedProvider::new(&fixture.home).with_settings_dir(&custom));

    assert_eq!(store.settings_dir().expect("settings_dir"), custom);
    assert_eq!(store.expand_home("~").expect("expand"), fixture.home);
    assert_eq!(store.expand_home("~/.ssh/id").expect("expand"), fixture.home.join(".ssh/id"));
    assert_eq!(
        store.expand_home("/etc/ssh").expect("expand").to_string_lossy(),
        "/etc/ssh"
    );

    store.load_global().expect("first run should create defaults");
    assert!(custom.join("config.yaml").exists());
    assert!(custom.join("local.yaml").exists());
}
