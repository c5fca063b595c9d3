//! 設定モデル
//!
//! すべてのフィールドは省略可能で、省略時は OpenShift 上の
//! サービスアカウント Pod で動かす前提のデフォルト値を使う。

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8443";
pub const DEFAULT_UPLOAD_DIR: &str = "/tmp/uploads";
pub const DEFAULT_ARTIFACT_FILE_NAME: &str = "vddk.tar.gz";
pub const DEFAULT_BUILD_CONFIG_NAME: &str = "vddk";
pub const DEFAULT_IMAGE_TAG: &str = "vddk:latest";
pub const DEFAULT_LEASE_SECONDS: u64 = 15;
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 1024;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// サーバー全体の設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// HTTP の待ち受けアドレス
    pub listen: String,
    /// ルートのプレフィックス（例: "/providers/vsphere/vddk"）
    pub route_prefix: String,
    /// アップロードされた tar を置くディレクトリ
    pub upload_dir: PathBuf,
    /// ステージングするファイル名
    pub artifact_file_name: String,
    /// 起動する BuildConfig 名
    pub build_config_name: String,
    /// ビルド結果の ImageStreamTag
    pub image_tag: String,
    /// ビルド受付後、次の受付を拒否し続ける秒数
    pub lease_seconds: u64,
    /// アップロードの上限サイズ (MiB)
    pub max_upload_mb: u64,
    pub cluster: ClusterSettings,
    pub plugin: PluginSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            route_prefix: String::new(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            artifact_file_name: DEFAULT_ARTIFACT_FILE_NAME.to_string(),
            build_config_name: DEFAULT_BUILD_CONFIG_NAME.to_string(),
            image_tag: DEFAULT_IMAGE_TAG.to_string(),
            lease_seconds: DEFAULT_LEASE_SECONDS,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            cluster: ClusterSettings::default(),
            plugin: PluginSettings::default(),
        }
    }
}

impl Settings {
    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(self.lease_seconds)
    }

    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }

    /// `{route_prefix}{path}` を返す（プレフィックスの末尾スラッシュは無視）
    pub fn route(&self, path: &str) -> String {
        format!("{}{}", self.route_prefix.trim_end_matches('/'), path)
    }

    /// 値の整合性チェック
    pub fn validate(&self) -> Result<()> {
        if self.lease_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "lease_seconds",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.max_upload_mb == 0 {
            return Err(ConfigError::Invalid {
                field: "max_upload_mb",
                reason: "must be greater than zero".to_string(),
            });
        }

        let file_name = Path::new(&self.artifact_file_name);
        if self.artifact_file_name.is_empty()
            || file_name.file_name().map(|n| n.to_string_lossy().into_owned())
                != Some(self.artifact_file_name.clone())
        {
            return Err(ConfigError::Invalid {
                field: "artifact_file_name",
                reason: format!("`{}` is not a bare file name", self.artifact_file_name),
            });
        }

        if self.build_config_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "build_config_name",
                reason: "must not be empty".to_string(),
            });
        }

        if self.image_tag.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "image_tag",
                reason: "must not be empty".to_string(),
            });
        }

        if !self.route_prefix.is_empty() && !self.route_prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "route_prefix",
                reason: format!("`{}` must start with '/'", self.route_prefix),
            });
        }

        Ok(())
    }
}

/// クラスタ API への接続設定
///
/// `api_server` と `namespace` は通常 Pod の環境から解決されるので、
/// ローカル開発時にだけ上書きする。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterSettings {
    pub api_server: Option<String>,
    pub namespace: Option<String>,
    pub namespace_file: PathBuf,
    pub token_file: PathBuf,
    pub ca_file: PathBuf,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        let sa = Path::new(SERVICE_ACCOUNT_DIR);
        Self {
            api_server: None,
            namespace: None,
            namespace_file: sa.join("namespace"),
            token_file: sa.join("token"),
            ca_file: sa.join("ca.crt"),
        }
    }
}

/// ESX 側 clone プラグインの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginSettings {
    pub clone_script: PathBuf,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            clone_script: PathBuf::from("/opt/vmware/vddk/clone.sh"),
        }
    }
}
