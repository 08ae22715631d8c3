pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// スタックファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "TECHHEALTH_CONFIG_PATH";

const CANDIDATES: [&str; 4] = [
    "stack.local.kdl",
    ".stack.local.kdl",
    "stack.kdl",
    ".stack.kdl",
];

/// グローバル設定ディレクトリ (~/.config/techhealth)
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("techhealth");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// stack.kdl を探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 TECHHEALTH_CONFIG_PATH (直接パス指定、存在しなければエラー)
/// 2. カレントディレクトリ: stack.local.kdl, .stack.local.kdl, stack.kdl, .stack.kdl
/// 3. ./.techhealth/ ディレクトリ内: 同様の順序
/// 4. ~/.config/techhealth/stack.kdl (グローバル設定)
pub fn find_stack_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(&config_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::ConfiguredPathMissing(config_path));
    }

    let current_dir = std::env::current_dir()?;
    if let Some(path) = find_in_dir(&current_dir) {
        return Ok(path);
    }

    let state_dir = current_dir.join(".techhealth");
    if state_dir.is_dir() {
        if let Some(path) = find_in_dir(&state_dir) {
            return Ok(path);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("techhealth").join("stack.kdl");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::StackFileNotFound)
}

fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// スタックファイルのあるディレクトリ（`.techhealth/` 内ならその親）
pub fn project_root_for(stack_file: &Path) -> PathBuf {
    let dir = stack_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    if dir.file_name().and_then(|n| n.to_str()) == Some(".techhealth") {
        dir.parent().map(Path::to_path_buf).unwrap_or(dir)
    } else {
        dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_get_config_dir() {
        let config_dir = get_config_dir().unwrap();
        assert!(config_dir.ends_with("techhealth"));
        assert!(config_dir.exists());
    }

    #[test]
    #[serial]
    fn test_find_stack_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("stack.kdl"), "// test").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_stack_file();

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with("stack.kdl"));
    }

    #[test]
    #[serial]
    fn test_find_stack_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("stack.kdl"), "// shared").unwrap();
        fs::write(temp_dir.path().join("stack.local.kdl"), "// local").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_stack_file();

        std::env::set_current_dir(original_dir).unwrap();
        // stack.local.kdl が優先される
        assert!(result.unwrap().ends_with("stack.local.kdl"));
    }

    #[test]
    #[serial]
    fn test_find_stack_file_in_state_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let dir = temp_dir.path().join(".techhealth");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("stack.kdl"), "// in state dir").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_stack_file();

        std::env::set_current_dir(original_dir).unwrap();
        let path = result.unwrap();
        assert!(path.ends_with(".techhealth/stack.kdl"));
        assert_eq!(
            project_root_for(&path).canonicalize().unwrap(),
            temp_dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    #[serial]
    fn test_find_stack_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.kdl");
        fs::write(&config_path, "// custom").unwrap();

        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        }

        let result = find_stack_file();

        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    #[serial]
    fn test_find_stack_file_env_var_missing() {
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, "/nonexistent/techhealth/stack.kdl");
        }

        let result = find_stack_file();

        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        assert!(matches!(result, Err(ConfigError::ConfiguredPathMissing(_))));
    }

    #[test]
    #[serial]
    fn test_hidden_file_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join(".stack.local.kdl"), "// hidden local").unwrap();
        fs::write(temp_dir.path().join("stack.kdl"), "// visible").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_stack_file();

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with(".stack.local.kdl"));
    }

    #[test]
    fn test_project_root_for_plain_dir() {
        let root = project_root_for(Path::new("/srv/infra/stack.kdl"));
        assert_eq!(root, PathBuf::from("/srv/infra"));
    }
}
