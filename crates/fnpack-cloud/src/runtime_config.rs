//! Cloud Runtime Config values for functions deploys.
//!
//! Variables live under `projects/<project>/configs/<config>/variables/<path>`
//! and are materialized into one object keyed by config, then by each
//! segment of the variable path:
//!
//! ```text
//! projects/p/configs/stripe/variables/keys/secret = "sk_123"
//!   → {"stripe": {"keys": {"secret": "sk_123"}}}
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use crate::executor::{RealExecutor, ToolError, ToolExecutor};

const API_BASE: &str = "https://runtimeconfig.googleapis.com/v1beta1";

/// Configs owned by the platform itself; never materialized.
const RESERVED_NAMESPACES: &[&str] = &["firebase"];

/// A Runtime Config variable and its text value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuntimeVariable {
    /// Full resource name.
    pub name: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Access to the Runtime Config API.
///
/// Production code uses [`HttpRuntimeConfigApi`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait RuntimeConfigApi: Send + Sync {
    /// Full resource names of every config in the project.
    async fn list_configs(&self, project_id: &str) -> Result<Vec<String>, ApiError>;

    /// Every variable of a config, with values.
    async fn list_variables(&self, config_name: &str) -> Result<Vec<RuntimeVariable>, ApiError>;
}

/// Fetches the project's runtime config for injection into the package.
///
/// Only a 500/503 from the service (or an error without a status, which
/// counts as 500) fails the call.
pub async fn get_functions_config<A: RuntimeConfigApi>(
    api: &A,
    project_id: &str,
) -> Result<Map<String, Value>, RuntimeConfigError> {
    let err = match materialize_all(api, project_id).await {
        Ok(config) => return Ok(config),
        Err(e) => e,
    };

    tracing::debug!(error = %err, "runtime config fetch failed");
    let status = err.status_code().unwrap_or_else(|| {
        tracing::debug!("got unexpected error from Runtime Config; it has no status code");
        500
    });

    if status == 500 || status == 503 {
        return Err(RuntimeConfigError::Unavailable { source: err });
    }

    // TODO: surface non-5xx failures to the caller instead of deploying with an
    // empty config; needs a decision on how `fnpack package` should report them.
    tracing::debug!(status, "continuing with empty runtime config");
    Ok(Map::new())
}

/// Builds the nested config object from every non-reserved config.
pub async fn materialize_all<A: RuntimeConfigApi>(
    api: &A,
    project_id: &str,
) -> Result<Map<String, Value>, ApiError> {
    let mut output = Map::new();

    for config_name in api.list_configs(project_id).await? {
        let config_id = config_id(&config_name)?;
        if RESERVED_NAMESPACES.contains(&config_id) {
            continue;
        }

        for variable in api.list_variables(&config_name).await? {
            let path = variable_path(&variable.name)?;
            let mut keys = vec![config_id];
            keys.extend(path.split(['/', '.']).filter(|s| !s.is_empty()));
            set_path(
                &mut output,
                &keys,
                Value::String(variable.text.unwrap_or_default()),
            );
        }
    }

    Ok(output)
}

/// `projects/<p>/configs/<id>` → `<id>`
fn config_id(name: &str) -> Result<&str, ApiError> {
    let mut parts = name.split('/');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("projects"), Some(_), Some("configs"), Some(id)) if !id.is_empty() => Ok(id),
        _ => Err(ApiError::MalformedName(name.to_owned())),
    }
}

/// `projects/<p>/configs/<id>/variables/<path...>` → `<path...>`
fn variable_path(name: &str) -> Result<&str, ApiError> {
    name.split_once("/variables/")
        .map(|(_, path)| path)
        .filter(|path| !path.is_empty())
        .ok_or_else(|| ApiError::MalformedName(name.to_owned()))
}

/// Sets `keys` to `value`, replacing any non-object found along the way.
fn set_path(target: &mut Map<String, Value>, keys: &[&str], value: Value) {
    let Some((last, parents)) = keys.split_last() else {
        return;
    };

    let mut node = target;
    for key in parents {
        let slot = node
            .entry((*key).to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(child) = slot else {
            return;
        };
        node = child;
    }
    node.insert((*last).to_owned(), value);
}

/// Runtime Config over HTTPS, authenticated with the active gcloud account.
pub struct HttpRuntimeConfigApi<E: ToolExecutor = RealExecutor> {
    http: reqwest::Client,
    executor: E,
    base_url: String,
    token: OnceCell<String>,
}

impl HttpRuntimeConfigApi<RealExecutor> {
    pub fn new() -> Self {
        Self::with_executor(RealExecutor)
    }
}

impl Default for HttpRuntimeConfigApi<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigList {
    #[serde(default)]
    configs: Vec<ConfigResource>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ConfigResource {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariableList {
    #[serde(default)]
    variables: Vec<RuntimeVariable>,
    next_page_token: Option<String>,
}

impl<E: ToolExecutor> HttpRuntimeConfigApi<E> {
    pub fn with_executor(executor: E) -> Self {
        Self {
            http: reqwest::Client::new(),
            executor,
            base_url: API_BASE.to_owned(),
            token: OnceCell::new(),
        }
    }

    /// Point at a different API root, e.g. a local fake.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a preconfigured HTTP client (proxy, timeouts).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    async fn access_token(&self) -> Result<&str, ApiError> {
        let token = self
            .token
            .get_or_try_init(|| async {
                let args = ["auth".to_owned(), "print-access-token".to_owned()];
                self.executor
                    .exec("gcloud", &args)
                    .await
                    .map(|out| out.trim().to_owned())
                    .map_err(|e| ApiError::Auth { source: e })
            })
            .await?;
        Ok(token)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        page_token: Option<&str>,
    ) -> Result<T, ApiError> {
        let token = self.access_token().await?;
        let mut request = self.http.get(url).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }

        let response = request.send().await.map_err(|e| ApiError::Request {
            url: url.to_owned(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(url, error = %e, "failed to read error response body");
                    String::new()
                }
            };
            return Err(ApiError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| ApiError::Request {
            url: url.to_owned(),
            source: e,
        })
    }
}

impl<E: ToolExecutor> RuntimeConfigApi for HttpRuntimeConfigApi<E> {
    async fn list_configs(&self, project_id: &str) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/projects/{project_id}/configs", self.base_url);
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page: ConfigList = self.get(&url, &[], page_token.as_deref()).await?;
            names.extend(page.configs.into_iter().map(|c| c.name));
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => return Ok(names),
            }
        }
    }

    async fn list_variables(&self, config_name: &str) -> Result<Vec<RuntimeVariable>, ApiError> {
        let url = format!("{}/{config_name}/variables", self.base_url);
        let mut variables = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page: VariableList = self
                .get(&url, &[("returnValues", "true")], page_token.as_deref())
                .await?;
            variables.extend(page.variables);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => return Ok(variables),
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to obtain an access token from gcloud")]
    Auth { source: ToolError },

    #[error("request to {url} failed")]
    Request { url: String, source: reqwest::Error },

    #[error("Runtime Config API returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected Runtime Config resource name {0:?}")]
    MalformedName(String),
}

impl ApiError {
    /// HTTP status of the failed call, when the service answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request { source, .. } => source.status().map(|s| s.as_u16()),
            Self::Auth { .. } | Self::MalformedName(_) => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeConfigError {
    #[error(
        "Cloud Runtime Config is currently experiencing issues, \
         which is preventing your functions from being deployed. \
         Please wait a few minutes and then try to deploy your functions again.\n\
         Run `fnpack package` without --fetch-config if you want to continue without runtime config."
    )]
    Unavailable { source: ApiError },
}
