//! Outgoing HTTP for the hosted adapters.
//!
//! Every request runs inside an `outgoing_http` span carrying method, URL
//! (query string stripped, it may hold keys) and response status.

use std::time::Duration;
use tracing::{Instrument, Level};

#[derive(Clone)]
pub struct TracedClient {
    inner: reqwest::Client,
}

impl TracedClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(inner))
    }

    pub async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let mut url = req.url().clone();
        url.set_query(None);

        let span = tracing::span!(
            Level::DEBUG,
            "outgoing_http",
            http.method = %req.method(),
            http.url = %url,
            http.status_code = tracing::field::Empty,
        );

        async {
            let response = self.inner.execute(req).await?;
            tracing::Span::current().record("http.status_code", response.status().as_u16());
            Ok(response)
        }
        .instrument(span)
        .await
    }

    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.inner.request(method, url)
    }
}

impl Default for TracedClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn executes_built_requests() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/ping").query_param("key", "k");
            then.status(204);
        });

        let client = TracedClient::default();
        let req = client
            .request(reqwest::Method::GET, &server.url("/ping?key=k"))
            .build()
            .unwrap();
        let resp = client.execute(req).await.unwrap();

        assert_eq!(resp.status(), 204);
        mock.assert();
    }
}
