use crate::fixtures::TestFixture;
use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::fs;

fn sshy(fixture: &TestFixture) -> Command {
    let mut cmd = Command::cargo_bin("sshy").expect("Failed to find sshy binary");
    cmd.env("HOME", &fixture.home)
        .env("SSHY_CONFIG_DIR", &fixture.settings)
        .env_remove("RUST_LOG")
        .env_remove("EDITOR");
    cmd
}

fn standard_fixture() -> TestFixture {
    let fixture = TestFixture::new().expect("Failed to create fixture");
    fixture.with_standard_setup().expect("Failed to write settings");
    fixture
}

#[test]
fn test_help_lists_subcommands() {
    let fixture = TestFixture::new().expect("Failed to create fixture");

    sshy(&fixture)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("connect"))
        .stdout(predicate::str::contains("scp"))
        .stdout(predicate::str::contains("view"));
}

#[test]
fn test_list_shows_every_layer() {
    let fixture = standard_fixture();

    sshy(&fixture)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("[S] web: deploy@10.0.0.1 [prod, web]"))
        .stdout(predicate::str::contains("[O] db: postgres@10.0.0.2 [prod]"))
        .stdout(predicate::str::contains("[L] lab: pi@lab.local [home]"));
}

#[test]
fn test_list_filters_by_tag() {
    let fixture = standard_fixture();

    sshy(&fixture)
        .args(["list", "--tags", "prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web:"))
        .stdout(predicate::str::contains("db:"))
        .stdout(predicate::str::contains("lab:").not());
}

#[test]
fn test_first_run_creates_default_files() {
    let fixture = TestFixture::new().expect("Failed to create fixture");

    sshy(&fixture).arg("list").assert().success().stdout(predicate::str::is_empty());

    assert!(fixture.settings.join("config.yaml").exists());
    assert!(fixture.settings.join("local.yaml").exists());
}

#[test]
fn test_config_dir_env_points_outside_home() {
    let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
    let home = temp_dir.child("home");
    home.create_dir_all().expect("Failed to create home");
    let team = temp_dir.child("team-settings");
    team.create_dir_all().expect("Failed to create settings dir");
    team.child("config.yaml")
        .write_str(&format!("servers_path: servers.json\nconfig_path: {}\n", team.path().display()))
        .expect("Failed to write config.yaml");
    team.child("servers.json")
        .write_str(r#"[{"name": "ci", "host": "ci.local"}]"#)
        .expect("Failed to write servers.json");

    Command::cargo_bin("sshy")
        .expect("Failed to find sshy binary")
        .env("HOME", home.path())
        .env("SSHY_CONFIG_DIR", team.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("[S] ci: ci.local []"));

    home.child(".sshy").assert(predicate::path::missing());
}

#[test]
fn test_add_then_list() {
    let fixture = standard_fixture();

    sshy(&fixture)
        .args(["add", "box", "10.1.1.1", "admin", "2200", "~/.ssh/box", "ci,arm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Server added successfully"));

    sshy(&fixture)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("[L] box: admin@10.1.1.1 [ci, arm]"));

    let local = fixture.read("local.yaml").expect("Failed to read local.yaml");
    assert!(local.contains("~/.ssh/box"));
}

#[test]
fn test_add_duplicate_private_name_fails() {
    let fixture = standard_fixture();

    sshy(&fixture)
        .args(["add", "lab", "10.9.9.9", "pi"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_rm_private_server() {
    let fixture = standard_fixture();

    sshy(&fixture)
        .args(["rm", "lab", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Server removed successfully"));

    let local = fixture.read("local.yaml").expect("Failed to read local.yaml");
    assert!(!local.contains("lab.local"));
    assert!(local.contains("10.0.0.2"));
}

#[test]
fn test_rm_shared_server_is_refused() {
    let fixture = standard_fixture();

    sshy(&fixture)
        .args(["rm", "web", "-y"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot be removed"));

    let shared = fixture.read("servers.yaml").expect("Failed to read servers.yaml");
    assert!(shared.contains("name: web"));
}

#[test]
fn test_view_local() {
    let fixture = standard_fixture();

    sshy(&fixture)
        .args(["view", "local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Local Configuration"))
        .stdout(predicate::str::contains("10.0.0.2"));
}

#[test]
fn test_view_missing_shared_file() {
    let fixture = TestFixture::new().expect("Failed to create fixture");
    fixture.with_global("servers.yaml").expect("Failed to write config.yaml");

    sshy(&fixture)
        .args(["view", "shared"])
        .assert()
        .success()
        .stdout(predicate::str::contains("does not exist or is empty"));
}

#[test]
fn test_unknown_server_fails() {
    let fixture = standard_fixture();

    sshy(&fixture)
        .arg("nosuch")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("server not found: nosuch"));
}

#[test]
fn test_scp_requires_two_endpoints() {
    let fixture = standard_fixture();

    sshy(&fixture).args(["scp", "web:/tmp"]).assert().code(1).stderr(predicate::str::contains("usage"));
}

#[cfg(unix)]
mod launch {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Install a stand-in for `program` that records its arguments, one per
    /// line, and exits with `code`.
    fn fake_tool(fixture: &TestFixture, program: &str, code: i32) -> PathBuf {
        let bin = fixture.temp.path().join("bin");
        fs::create_dir_all(&bin).expect("Failed to create bin directory");

        let log = fixture.temp.path().join(format!("{program}.args"));
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\nexit {code}\n",
            log.display()
        );
        let path = bin.join(program);
        fs::write(&path, script).expect("Failed to write fake tool");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make fake tool executable");
        log
    }

    fn with_fake_path(cmd: &mut Command, fixture: &TestFixture) {
        let bin = fixture.temp.path().join("bin");
        let system = std::env::var("PATH").unwrap_or_default();
        cmd.env("PATH", format!("{}:{system}", bin.display()));
    }

    fn recorded(log: &Path) -> Vec<String> {
        fs::read_to_string(log)
            .expect("fake tool should have run")
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_implicit_connect_passes_exit_code_through() {
        let fixture = standard_fixture();
        let log = fake_tool(&fixture, "ssh", 3);

        let mut cmd = sshy(&fixture);
        with_fake_path(&mut cmd, &fixture);
        cmd.args(["web", "-v", "--", "uptime"]).assert().code(3);

        assert_eq!(recorded(&log), vec!["-p", "2222", "-v", "deploy@10.0.0.1", "uptime"]);
    }

    #[test]
    fn test_connect_uses_override_and_options() {
        let fixture = standard_fixture();
        let log = fake_tool(&fixture, "ssh", 0);

        let mut cmd = sshy(&fixture);
        with_fake_path(&mut cmd, &fixture);
        cmd.args(["connect", "db"]).assert().success();

        assert_eq!(recorded(&log), vec!["-i", "~/.ssh/db", "-A", "postgres@10.0.0.2"]);
    }

    #[test]
    fn test_scp_resolves_server_names() {
        let fixture = standard_fixture();
        let log = fake_tool(&fixture, "scp", 0);

        let mut cmd = sshy(&fixture);
        with_fake_path(&mut cmd, &fixture);
        cmd.args(["scp", "-r", "./dist", "web:/srv/app"]).assert().success();

        assert_eq!(recorded(&log), vec!["-P", "2222", "-r", "./dist", "deploy@10.0.0.1:/srv/app"]);
    }

    #[test]
    fn test_sftp_with_user_flag() {
        let fixture = standard_fixture();
        let log = fake_tool(&fixture, "sftp", 0);

        let mut cmd = sshy(&fixture);
        with_fake_path(&mut cmd, &fixture);
        cmd.args(["sftp", "-l", "root", "lab"]).assert().success();

        assert_eq!(recorded(&log), vec!["-i", "~/.ssh/lab", "root@lab.local"]);
    }
}
