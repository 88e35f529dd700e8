use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::SanityStoreConfig;
use crate::infra::http::TracedClient;

const MAX_ERROR_BODY: usize = 512;

#[derive(Deserialize)]
struct QueryResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct MutateResponse {
    #[serde(rename = "transactionId")]
    transaction_id: String,
    #[serde(default)]
    results: Vec<MutationResult>,
}

#[derive(Deserialize)]
struct MutationResult {
    #[serde(default)]
    document: Option<Value>,
}

/// Query and mutate endpoints of one dataset.
pub struct SanityClient {
    http: TracedClient,
    query_url: Url,
    mutate_url: Url,
    token: Option<String>,
}

impl SanityClient {
    pub fn new(cfg: &SanityStoreConfig) -> anyhow::Result<Self> {
        let base = match &cfg.api_host {
            Some(host) => host.clone(),
            None => Url::parse(&format!("https://{}.api.sanity.io", cfg.project_id))
                .with_context(|| format!("invalid project id '{}'", cfg.project_id))?,
        };
        let version = cfg.api_version.trim_start_matches('v');
        let query_url = base
            .join(&format!("v{version}/data/query/{}", cfg.dataset))
            .context("invalid query endpoint")?;
        let mut mutate_url = base
            .join(&format!("v{version}/data/mutate/{}", cfg.dataset))
            .context("invalid mutate endpoint")?;
        mutate_url.set_query(Some("returnDocuments=true"));

        Ok(Self {
            http: TracedClient::with_timeout(cfg.timeout)?,
            query_url,
            mutate_url,
            token: cfg.token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Run a query; each parameter is sent JSON-encoded as `$name`.
    #[instrument(name = "profile_sync.sanity.query", skip(self, params), level = "debug")]
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &[(&str, Value)],
    ) -> anyhow::Result<T> {
        let mut url = self.query_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            for (name, value) in params {
                pairs.append_pair(&format!("${name}"), &value.to_string());
            }
        }

        let req = self.authorized(self.http.request(reqwest::Method::GET, url.as_str()));
        let body: QueryResponse<T> = self.send(req, "query").await?;
        Ok(body.result)
    }

    /// Commit `mutations` as one transaction and return the touched documents.
    #[instrument(name = "profile_sync.sanity.mutate", skip_all, fields(count = mutations.len()))]
    pub async fn mutate(&self, mutations: Vec<Value>) -> anyhow::Result<Vec<Value>> {
        let req = self
            .authorized(self.http.request(reqwest::Method::POST, self.mutate_url.as_str()))
            .json(&serde_json::json!({ "mutations": mutations }));
        let body: MutateResponse = self.send(req, "mutate").await?;
        debug!(transaction = %body.transaction_id, "mutation committed");
        Ok(body.results.into_iter().filter_map(|r| r.document).collect())
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        what: &str,
    ) -> anyhow::Result<T> {
        let req = req.build().with_context(|| format!("failed to build {what} request"))?;
        let resp = self
            .http
            .execute(req)
            .await
            .with_context(|| format!("content store {what} request failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let text: String = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            bail!("content store {what} returned {status}: {text}");
        }
        resp.json::<T>()
            .await
            .with_context(|| format!("malformed content store {what} response"))
    }
}
