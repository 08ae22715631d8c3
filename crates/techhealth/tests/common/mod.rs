use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_stack_kdl(&self, content: &str) {
        let path = self.root.path().join("stack.kdl");
        fs::write(path, content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.path().join(".techhealth").join("state.json")
    }

    /// プロジェクト内で実行するコマンド（グローバル設定は見ない）
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("techhealth").unwrap();
        cmd.current_dir(self.path())
            .env_remove("TECHHEALTH_CONFIG_PATH")
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join(".config"))
            .env("NO_COLOR", "1");
        cmd
    }
}
