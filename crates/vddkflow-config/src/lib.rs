pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{ClusterSettings, PluginSettings, Settings};

use std::path::{Path, PathBuf};

/// 設定ファイルのパスを指定する環境変数
pub const CONFIG_PATH_ENV: &str = "VDDKFLOW_CONFIG_PATH";

const CANDIDATES: [&str; 2] = ["vddkflow.local.yaml", "vddkflow.yaml"];

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 引数で明示されたパス（存在しなければエラー）
/// 2. 環境変数 VDDKFLOW_CONFIG_PATH（存在しなければエラー）
/// 3. カレントディレクトリ: vddkflow.local.yaml, vddkflow.yaml
/// 4. ~/.config/vddkflow/vddkflow.yaml
///
/// どれも見つからない場合は `Ok(None)` を返し、デフォルト設定で起動する。
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    // 1. 明示指定
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(ConfigError::ExplicitFileNotFound(path.to_path_buf()));
    }

    // 2. 環境変数
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::ExplicitFileNotFound(path));
    }

    // 3. カレントディレクトリ
    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    // 4. グローバル設定
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("vddkflow").join("vddkflow.yaml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

/// 指定パスの YAML を読み込んで検証する
pub fn load_from_path(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let settings: Settings = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    settings.validate()?;
    Ok(settings)
}

/// 設定を解決する（ファイルが無ければデフォルト）
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    match find_config_file(explicit)? {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            load_from_path(&path)
        }
        None => {
            tracing::debug!("No configuration file found, using defaults");
            let settings = Settings::default();
            settings.validate()?;
            Ok(settings)
        }
    }
}
