#![allow(dead_code)]

use sshy::config::FixedProvider;
use sshy::SettingsStore;
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

pub const SHARED_YAML: &str = r"- name: web
  host: 10.0.0.1
  user: deploy
  port: 2222
  tags: [prod, web]
- name: db
  host: db.internal
  user: postgres
  tags: [prod]
  options:
    ForwardAgent: yes
";

pub const LOCAL_YAML: &str = r"overrides:
  db:
    host: 10.0.0.2
    key: ~/.ssh/db
private:
  - name: lab
    host: lab.local
    user: pi
    key: ~/.ssh/lab
    tags: [home]
";

/// Test fixture for a temporary home directory with a `.sshy` settings dir
pub struct TestFixture {
    /// Temporary directory that will be cleaned up on drop
    pub temp: TempDir,
    /// Path used as `$HOME`
    pub home: PathBuf,
    /// Path to the settings directory (`$HOME/.sshy`)
    pub settings: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with temporary directories
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempdir()?;
        let home = temp_dir.path().join("home");
        let settings = home.join(".sshy");
        fs::create_dir_all(&settings)?;

        Ok(Self { temp: temp_dir, home, settings })
    }

    /// Store pinned to this fixture's directories
    pub fn store(&self) -> SettingsStore {
        SettingsStore::new(FixedProvider::new(&self.home))
    }

    /// Write a file inside the settings directory
    pub fn with_file(&self, name: &str, content: &str) -> std::io::Result<&Self> {
        fs::write(self.settings.join(name), content)?;
        Ok(self)
    }

    /// Global settings pointing at `servers_path` inside the settings directory
    pub fn with_global(&self, servers_path: &str) -> std::io::Result<&Self> {
        let content = format!(
            "servers_path: {servers_path}\nconfig_path: {}\n",
            self.settings.display()
        );
        self.with_file("config.yaml", &content)
    }

    /// Shared list, local layer and global settings used by most tests
    pub fn with_standard_setup(&self) -> std::io::Result<&Self> {
        self.with_global("servers.yaml")?
            .with_file("servers.yaml", SHARED_YAML)?
            .with_file("local.yaml", LOCAL_YAML)
    }

    pub fn read(&self, name: &str) -> std::io::Result<String> {
        fs::read_to_string(self.settings.join(name))
    }
}
