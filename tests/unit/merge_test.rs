use crate::fixtures::TestFixture;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sshy::merge::{apply_override, shared_only};
use sshy::{
    merge_servers, merge_servers_with_source, LocalSettings, MergeEngine, Server, ServerOverride,
    ServerSource,
};
use std::collections::BTreeMap;

fn server_strategy() -> impl Strategy<Value = Server> {
    ("[a-z]{1,8}", "[a-z0-9.]{1,12}", "[a-z]{0,6}", 0u16..3000, "(~/keys/[a-z]{1,6})?").prop_map(
        |(name, host, user, port, key)| Server { name, host, user, port, key, ..Server::default() },
    )
}

fn override_strategy() -> impl Strategy<Value = ServerOverride> {
    ("([a-z0-9.]{1,12})?", "([a-z]{1,6})?", prop_oneof![Just(0u16), 1u16..3000]).prop_map(
        |(host, user, port)| ServerOverride { host, user, port, ..ServerOverride::default() },
    )
}

/// A shared list plus overrides keyed by a random subset of its names.
fn shared_with_overrides() -> impl Strategy<Value = (Vec<Server>, BTreeMap<String, ServerOverride>)>
{
    prop::collection::vec(server_strategy(), 0..8)
        .prop_flat_map(|shared| {
            let picks = prop::collection::vec((any::<bool>(), override_strategy()), shared.len());
            (Just(shared), picks)
        })
        .prop_map(|(shared, picks)| {
            let overrides: BTreeMap<String, ServerOverride> = shared
                .iter()
                .zip(picks)
                .filter(|(_, (chosen, _))| *chosen)
                .map(|(server, (_, ov))| (server.name.clone(), ov))
                .collect();
            (shared, overrides)
        })
}

proptest! {
    #[test]
    fn merge_with_overrides_keeps_names_and_order(
        (shared, overrides) in shared_with_overrides()
    ) {
        let local = LocalSettings { overrides: overrides.clone(), ..LocalSettings::default() };
        let merged = merge_servers_with_source(&shared, &local);

        prop_assert_eq!(merged.len(), shared.len());
        for (entry, original) in merged.iter().zip(&shared) {
            prop_assert_eq!(&entry.server.name, &original.name);

            match overrides.get(&original.name) {
                Some(ov) => {
                    prop_assert_eq!(entry.source, ServerSource::Override);
                    let host = if ov.host.is_empty() { &original.host } else { &ov.host };
                    let port = if ov.port == 0 { original.port } else { ov.port };
                    prop_assert_eq!(&entry.server.host, host);
                    prop_assert_eq!(entry.server.port, port);
                },
                None => {
                    prop_assert_eq!(entry.source, ServerSource::Shared);
                    prop_assert_eq!(&entry.server, original);
                },
            }
        }
    }

    #[test]
    fn merge_without_local_layer_keeps_shared_list(
        shared in prop::collection::vec(server_strategy(), 0..8)
    ) {
        let merged = merge_servers_with_source(&shared, &LocalSettings::default());

        prop_assert_eq!(merged.len(), shared.len());
        for (entry, original) in merged.iter().zip(&shared) {
            prop_assert_eq!(&entry.server, original);
            prop_assert_eq!(entry.source, ServerSource::Shared);
        }
    }

    #[test]
    fn merge_appends_private_servers_in_order(
        shared in prop::collection::vec(server_strategy(), 0..6),
        private in prop::collection::vec(server_strategy(), 0..6),
    ) {
        let local = LocalSettings { private: private.clone(), ..LocalSettings::default() };
        let merged = merge_servers(&shared, &local);

        let names: Vec<&str> = merged.iter().map(|s| s.name.as_str()).collect();
        let expected: Vec<&str> =
            shared.iter().chain(&private).map(|s| s.name.as_str()).collect();
        prop_assert_eq!(names, expected);
    }

    #[test]
    fn empty_override_changes_nothing(server in server_strategy()) {
        let mut patched = server.clone();
        apply_override(&mut patched, &ServerOverride::default());
        prop_assert_eq!(patched, server);
    }

    #[test]
    fn shared_only_drops_keys_and_private_names(
        shared in prop::collection::vec(server_strategy(), 0..6),
        private in prop::collection::vec(server_strategy(), 0..6),
    ) {
        let local = LocalSettings { private: private.clone(), ..LocalSettings::default() };
        let effective = merge_servers(&shared, &local);
        let written = shared_only(&effective, &local);

        for server in &written {
            prop_assert!(server.key.is_empty());
            prop_assert!(!private.iter().any(|p| p.name == server.name));
        }
    }
}

#[test]
fn test_load_effective_applies_override_fields() {
    let fixture = TestFixture::new().expect("Failed to create fixture");
    fixture.with_standard_setup().expect("Failed to write settings");
    let store = fixture.store();
    let settings = store.load_global().expect("Failed to load global settings");

    let entries = MergeEngine::new(&store)
        .load_effective_with_source(&settings)
        .expect("Failed to load effective servers");

    let summary: Vec<(&str, ServerSource)> =
        entries.iter().map(|e| (e.server.name.as_str(), e.source)).collect();
    assert_eq!(
        summary,
        vec![
            ("web", ServerSource::Shared),
            ("db", ServerSource::Override),
            ("lab", ServerSource::Local),
        ]
    );

    let db = &entries[1].server;
    assert_eq!(db.host, "10.0.0.2");
    assert_eq!(db.user, "postgres");
    assert_eq!(db.key, "~/.ssh/db");
    assert_eq!(db.tags, vec!["prod"]);
    assert!(db.options.contains_key("ForwardAgent"));
}

#[test]
fn test_write_back_round_trip_omits_private_data() {
    let fixture = TestFixture::new().expect("Failed to create fixture");
    fixture.with_standard_setup().expect("Failed to write settings");
    let store = fixture.store();
    let settings = store.load_global().expect("Failed to load global settings");
    let engine = MergeEngine::new(&store);

    let local = store.load_local().expect("Failed to load local settings");
    let effective = engine.load_effective(&settings).expect("Failed to load servers");

    let path = engine
        .write_back(&fixture.settings, "servers.yaml", &effective, &local)
        .expect("write_back should succeed");
    assert_eq!(path, fixture.settings.join("servers.yaml"));

    let written = fixture.read("servers.yaml").expect("Failed to read servers file");
    assert!(!written.contains("key:"));
    assert!(!written.contains("lab"));

    let reloaded = engine
        .load_shared(&fixture.settings, "servers.yaml")
        .expect("Failed to reload shared servers");
    let names: Vec<&str> = reloaded.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["web", "db"]);
    assert_eq!(reloaded[1].host, "10.0.0.2");
}

#[test]
fn test_load_shared_missing_file_is_empty() {
    let fixture = TestFixture::new().expect("Failed to create fixture");
    let store = fixture.store();

    let servers = MergeEngine::new(&store)
        .load_shared(&fixture.settings, "nothing-here.yaml")
        .expect("missing file should not be an error");
    assert!(servers.is_empty());
}

#[cfg(unix)]
#[test]
fn test_write_back_new_shared_file_is_readable_by_others() {
    use std::os::unix::fs::PermissionsExt;

    let fixture = TestFixture::new().expect("Failed to create fixture");
    let store = fixture.store();

    let path = MergeEngine::new(&store)
        .write_back(
            &fixture.settings,
            "team.yaml",
            &[Server::new("a", "h")],
            &LocalSettings::default(),
        )
        .expect("write_back should succeed");

    let mode = std::fs::metadata(&path).expect("metadata").permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
}
