//! WHO ICD-11 API client: OAuth2 client-credentials token handling and
//! recursive catalog synchronisation for the TM2 and Biomedicine modules.
//!
//! Sync failures never propagate. Each endpoint and each node is processed
//! independently; failures are logged, counted and reported as a `FAILED`
//! data-sync audit event.

use crate::{
    config::Icd11Config,
    db::TerminologyStore,
    models::{Catalog, CodeDetails, Icd11Module, TerminologyCode},
    services::audit::AuditLogger,
    Error, Result,
};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const API_VERSION_HEADER: &str = "API-Version";
const API_VERSION: &str = "v2";
const TOKEN_REQUEST_BODY: &str = "grant_type=client_credentials&scope=icdapi_access";

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub obtained_at: Instant,
}

/// Shared bearer token slot. Empty until the first successful fetch and
/// cleared again whenever a refresh fails.
#[derive(Debug, Default)]
pub struct TokenState {
    inner: RwLock<Option<AccessToken>>,
}

impl TokenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<String> {
        self.inner.read().await.as_ref().map(|t| t.value.clone())
    }

    pub async fn set(&self, value: String) {
        *self.inner.write().await = Some(AccessToken {
            value,
            obtained_at: Instant::now(),
        });
    }

    pub async fn invalidate(&self) {
        *self.inner.write().await = None;
    }

    pub async fn age(&self) -> Option<Duration> {
        self.inner.read().await.as_ref().map(|t| t.obtained_at.elapsed())
    }
}

/// A node of the ICD-11 `child` tree, flattened
#[derive(Debug, Clone, PartialEq)]
pub struct Icd11Node {
    pub code: String,
    pub title: String,
    pub definition: Option<String>,
    pub foundation_uri: Option<String>,
    pub parent: Option<String>,
}

fn code_from_id(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn language_value(node: &JsonValue, field: &str) -> Option<String> {
    node.get(field)
        .and_then(|v| v.get("@value"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Walk `root.child` depth-first, parents before children.
///
/// Nodes without an `@id` are skipped along with their subtree; child entries
/// that are bare URIs rather than embedded entities are ignored.
pub fn flatten_children(root: &JsonValue) -> Vec<Icd11Node> {
    let mut out = Vec::new();
    if let Some(children) = root.get("child").and_then(|v| v.as_array()) {
        for child in children {
            walk(child, None, &mut out);
        }
    }
    out
}

fn walk(node: &JsonValue, parent: Option<&str>, out: &mut Vec<Icd11Node>) {
    if !node.is_object() {
        return;
    }
    let Some(id) = node
        .get("@id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
    else {
        tracing::warn!("Skipping ICD-11 node with missing @id");
        return;
    };

    let code = code_from_id(id).to_string();
    out.push(Icd11Node {
        code: code.clone(),
        title: language_value(node, "title").unwrap_or_default(),
        definition: language_value(node, "definition"),
        foundation_uri: node
            .get("foundationReference")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        parent: parent.map(str::to_string),
    });

    if let Some(children) = node.get("child").and_then(|v| v.as_array()) {
        for child in children {
            walk(child, Some(&code), out);
        }
    }
}

#[derive(Clone)]
pub struct Icd11Client {
    http: reqwest::Client,
    config: Icd11Config,
    token: Arc<TokenState>,
    terminology: Arc<dyn TerminologyStore>,
    audit: AuditLogger,
}

impl Icd11Client {
    pub fn new(
        config: Icd11Config,
        token: Arc<TokenState>,
        terminology: Arc<dyn TerminologyStore>,
        audit: AuditLogger,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            config,
            token,
            terminology,
            audit,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn token_state(&self) -> &Arc<TokenState> {
        &self.token
    }

    /// Fetch a fresh token. The slot is cleared when the fetch fails.
    pub async fn refresh_token(&self) -> Result<()> {
        match self.fetch_token().await {
            Ok(token) => {
                self.token.set(token).await;
                tracing::info!("Obtained ICD-11 API access token");
                Ok(())
            }
            Err(e) => {
                self.token.invalidate().await;
                tracing::error!(error = %e, "Failed to obtain ICD-11 API access token");
                Err(e)
            }
        }
    }

    async fn fetch_token(&self) -> Result<String> {
        let response = self
            .http
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(API_VERSION_HEADER, API_VERSION)
            .body(TOKEN_REQUEST_BODY)
            .send()
            .await?
            .error_for_status()?;

        let body: JsonValue = response.json().await?;
        body.get("access_token")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Internal("access_token missing from token response".to_string()))
    }

    /// Sync both modules; returns the number of codes saved
    pub async fn sync_all(&self) -> usize {
        if !self.is_enabled() {
            tracing::warn!("ICD-11 API disabled, skipping synchronization");
            return 0;
        }
        tracing::info!("Starting ICD-11 data synchronization");
        if self.token.current().await.is_none() {
            // sync proceeds without a token if the refresh fails; the API will reject it
            let _ = self.refresh_token().await;
        }

        let mut saved = 0;
        for module in Icd11Module::ALL {
            saved += self.sync_module(module).await;
        }
        tracing::info!(saved, "ICD-11 data synchronization completed");
        saved
    }

    pub async fn sync_module(&self, module: Icd11Module) -> usize {
        let endpoint = match module {
            Icd11Module::Tm2 => &self.config.tm2_endpoint,
            Icd11Module::Biomedicine => &self.config.biomedicine_endpoint,
        };
        let system = format!("ICD11_{}", module.as_str());

        let outcome = match self.fetch(endpoint).await {
            Ok(root) => Ok(self.save_nodes(flatten_children(&root), module).await),
            Err(e) => Err(e),
        };

        let (status, saved) = match outcome {
            Ok(saved) => ("SUCCESS", saved),
            Err(e) => {
                tracing::error!(endpoint = %endpoint, error = %e, "Failed to sync ICD-11 codes");
                ("FAILED", 0)
            }
        };
        self.audit.data_sync(&system, status);
        crate::metrics::ICD11_SYNC_TOTAL
            .with_label_values(&[module.as_str(), status])
            .inc();
        crate::metrics::set_catalog_size(Catalog::Icd11, &*self.terminology).await;
        saved
    }

    async fn fetch(&self, endpoint: &str) -> Result<JsonValue> {
        let mut request = self
            .http
            .get(endpoint)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, "en")
            .header(API_VERSION_HEADER, API_VERSION);
        if let Some(token) = self.token.current().await {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Upsert nodes, keeping fields the API does not carry (chapter, synonyms)
    async fn save_nodes(&self, nodes: Vec<Icd11Node>, module: Icd11Module) -> usize {
        let mut saved = 0;
        for node in nodes {
            match self.save_node(node, module).await {
                Ok(()) => saved += 1,
                Err(e) => tracing::error!(error = %e, "Failed to process ICD-11 node"),
            }
        }
        saved
    }

    async fn save_node(&self, node: Icd11Node, module: Icd11Module) -> Result<()> {
        let mut code = self
            .terminology
            .find_by_code(Catalog::Icd11, &node.code)
            .await?
            .unwrap_or_else(|| TerminologyCode::icd11(node.code.clone(), node.title.clone(), module));

        code.display = node.title;
        code.definition = node.definition;
        if node.parent.is_some() {
            code.parent = node.parent;
        }
        if let CodeDetails::Icd11(details) = &mut code.details {
            details.foundation_uri = node.foundation_uri;
        }
        self.terminology.save(code).await?;
        Ok(())
    }
}
