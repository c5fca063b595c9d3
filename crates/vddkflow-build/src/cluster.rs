//! クラスタ接続情報の解決
//!
//! Pod のサービスアカウントからネームスペース、トークン、CA を読み込み、
//! OpenShift API 用の HTTP クライアントを組み立てます。呼び出しごとに
//! ファイルを読み直すので、トークンのローテーションにも追従します。

use crate::error::{BuildError, BuildResult};
use reqwest::{Method, RequestBuilder};
use std::path::Path;
use vddkflow_config::ClusterSettings;

const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";
const SERVICE_PORT_ENV: &str = "KUBERNETES_SERVICE_PORT";

/// クラスタ接続設定
#[derive(Debug, Clone)]
pub struct ClusterContext {
    settings: ClusterSettings,
}

impl Default for ClusterContext {
    fn default() -> Self {
        Self::new(ClusterSettings::default())
    }
}

impl ClusterContext {
    pub fn new(settings: ClusterSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    /// この Pod が動いているネームスペース
    ///
    /// 設定での上書きがあればそれを、なければ namespace ファイルを使う。
    pub fn namespace(&self) -> BuildResult<String> {
        if let Some(namespace) = self.settings.namespace.as_deref() {
            return Ok(namespace.to_string());
        }

        let path = &self.settings.namespace_file;
        let content =
            std::fs::read_to_string(path).map_err(|source| BuildError::NamespaceUnreadable {
                path: path.clone(),
                source,
            })?;

        let namespace = content.trim();
        if namespace.is_empty() {
            return Err(BuildError::NamespaceEmpty(path.clone()));
        }
        Ok(namespace.to_string())
    }

    /// API サーバーのベース URL
    ///
    /// 上書きがなければ KUBERNETES_SERVICE_HOST / KUBERNETES_SERVICE_PORT から組み立てる。
    pub fn api_server(&self) -> BuildResult<String> {
        if let Some(server) = self.settings.api_server.as_deref() {
            return Ok(server.trim_end_matches('/').to_string());
        }

        let host = std::env::var(SERVICE_HOST_ENV).ok().filter(|h| !h.is_empty());
        let port = std::env::var(SERVICE_PORT_ENV).ok().filter(|p| !p.is_empty());
        match (host, port) {
            // IPv6 のホストは [] で囲む
            (Some(host), Some(port)) if host.contains(':') => {
                Ok(format!("https://[{}]:{}", host, port))
            }
            (Some(host), Some(port)) => Ok(format!("https://{}:{}", host, port)),
            _ => Err(BuildError::NotInCluster),
        }
    }

    /// サービスアカウントトークン
    ///
    /// API サーバーを明示した場合（ローカル開発、kubectl proxy 等）は
    /// トークンファイルが無くても認証なしで続行する。
    fn token(&self) -> BuildResult<Option<String>> {
        let path = &self.settings.token_file;
        match std::fs::read_to_string(path) {
            Ok(token) => Ok(Some(token.trim().to_string())),
            Err(e)
                if e.kind() == std::io::ErrorKind::NotFound
                    && self.settings.api_server.is_some() =>
            {
                tracing::debug!("Token file not found at {:?}, continuing without auth", path);
                Ok(None)
            }
            Err(source) => Err(BuildError::Token {
                path: path.clone(),
                source,
            }),
        }
    }

    fn http_client(&self) -> BuildResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder();

        let ca_path = &self.settings.ca_file;
        if ca_path.exists() {
            builder = builder.add_root_certificate(load_ca(ca_path)?);
        }

        Ok(builder.build()?)
    }

    /// 接続情報をすべて解決して API クライアントを作る
    pub fn connect(&self) -> BuildResult<ApiClient> {
        let namespace = self.namespace()?;
        let base_url = self.api_server()?;
        let token = self.token()?;
        let http = self.http_client()?;

        Ok(ApiClient {
            http,
            base_url,
            token,
            namespace,
        })
    }
}

fn load_ca(path: &Path) -> BuildResult<reqwest::Certificate> {
    let pem = std::fs::read(path).map_err(|e| BuildError::CaCertificate {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    reqwest::Certificate::from_pem(&pem).map_err(|e| BuildError::CaCertificate {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// ネームスペースに束縛された API クライアント
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    namespace: String,
}

impl ApiClient {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `/apis/{group}/{version}/namespaces/{ns}/{resource}` 形式のパス
    pub fn namespaced_path(&self, group_version: &str, resource: &str) -> String {
        format!(
            "{}/apis/{}/namespaces/{}/{}",
            self.base_url, group_version, self.namespace, resource
        )
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // トークンは出力しない
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("namespace", &self.namespace)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}
