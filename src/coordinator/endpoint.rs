//! One cluster member, reached over HTTP

use crate::common::{group_id_of, Error, Group, GroupList, Result, REQUEST_TIMEOUT};
use crate::coordinator::retry::BackoffRetrier;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::Method;
use serde_json::Value;
use tracing::{error, info, warn};

/// Characters escaped when a group id becomes a path segment
const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Result of one create/delete against one node
#[derive(Debug)]
pub struct OperationOutcome {
    /// Base URL of the node that produced this outcome
    pub endpoint: String,
    pub result: Result<()>,
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }
}

/// A node's base address plus the resource path of its group collection.
///
/// Immutable once built. `create_record` and `delete_record` go through the
/// retrier; reads and the bulk clear are single attempts.
#[derive(Debug, Clone)]
pub struct RemoteEndpoint {
    base_url: String,
    resource_path: String,
    http: reqwest::Client,
    retrier: BackoffRetrier,
}

impl RemoteEndpoint {
    /// Build an endpoint with its own client and the default retry policy
    pub fn new(base_url: impl Into<String>, resource_path: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client: {}", e)))?;
        Ok(Self::with_client(
            base_url,
            resource_path,
            http,
            BackoffRetrier::default(),
        ))
    }

    /// Build an endpoint on a shared client. Every request still gets the
    /// 5-second timeout, whatever the client was built with.
    pub fn with_client(
        base_url: impl Into<String>,
        resource_path: impl Into<String>,
        http: reqwest::Client,
        retrier: BackoffRetrier,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            resource_path: resource_path.into().trim_matches('/').to_string(),
            http,
            retrier,
        }
    }

    pub fn with_retrier(mut self, retrier: BackoffRetrier) -> Self {
        self.retrier = retrier;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    pub fn retrier(&self) -> &BackoffRetrier {
        &self.retrier
    }

    fn collection_url(&self) -> String {
        format!("{}/{}/", self.base_url, self.resource_path)
    }

    fn record_url(&self, id: &str) -> String {
        format!(
            "{}/{}/{}/",
            self.base_url,
            self.resource_path,
            utf8_percent_encode(id, SEGMENT_ENCODE_SET)
        )
    }

    /// Send `data` to the collection, retrying any failure.
    ///
    /// 4xx/5xx answers count as failures here, same as transport errors.
    pub async fn try_send(&self, method: Method, data: &Value) -> Result<()> {
        let url = self.collection_url();
        self.retrier
            .run(|| async {
                self.http
                    .request(method.clone(), url.as_str())
                    .timeout(REQUEST_TIMEOUT)
                    .json(data)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok::<(), Error>(())
            })
            .await
    }

    /// `POST {resource}/`. Never fails to its caller; a duplicate is a
    /// failed outcome like any other.
    pub async fn create_record(&self, data: &Value) -> OperationOutcome {
        let result = self.try_send(Method::POST, data).await;
        match &result {
            Ok(()) => info!(endpoint = %self.base_url, group_id = group_id_of(data), "CREATE OK"),
            Err(e) => error!(endpoint = %self.base_url, group_id = group_id_of(data), error = %e, "CREATE failed"),
        }
        OperationOutcome {
            endpoint: self.base_url.clone(),
            result,
        }
    }

    /// `DELETE {resource}/`, same absorption as `create_record`.
    pub async fn delete_record(&self, data: &Value) -> OperationOutcome {
        let result = self.try_send(Method::DELETE, data).await;
        match &result {
            Ok(()) => info!(endpoint = %self.base_url, group_id = group_id_of(data), "DELETE OK"),
            Err(e) => error!(endpoint = %self.base_url, group_id = group_id_of(data), error = %e, "DELETE failed"),
        }
        OperationOutcome {
            endpoint: self.base_url.clone(),
            result,
        }
    }

    /// `GET {resource}/{id}/`.
    ///
    /// `None` covers both "absent on this node" and "node unreachable"; the
    /// two are not told apart.
    pub async fn get_record(&self, id: &str) -> Option<Group> {
        let url = self.record_url(id);
        let response = match self.http.get(&url).timeout(REQUEST_TIMEOUT).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(endpoint = %self.base_url, group_id = id, error = %Error::from(e), "GET failed");
                return None;
            }
        };
        if !response.status().is_success() {
            return None;
        }
        match response.json::<Group>().await {
            Ok(group) => Some(group),
            Err(e) => {
                warn!(endpoint = %self.base_url, group_id = id, error = %e, "GET returned an unreadable body");
                None
            }
        }
    }

    /// `GET /v1/groups`, with the same failure conflation as `get_record`
    pub async fn list_records(&self) -> Option<GroupList> {
        let url = format!("{}/v1/groups", self.base_url);
        let response = match self.http.get(&url).timeout(REQUEST_TIMEOUT).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(endpoint = %self.base_url, status = %response.status(), "list rejected");
                return None;
            }
            Err(e) => {
                error!(endpoint = %self.base_url, error = %Error::from(e), "list failed");
                return None;
            }
        };
        response.json::<GroupList>().await.ok()
    }

    /// `DELETE /v1/groups/`: wipe this node's records. Reset tooling only.
    pub async fn delete_all(&self) -> bool {
        let url = format!("{}/v1/groups/", self.base_url);
        match self.http.delete(&url).timeout(REQUEST_TIMEOUT).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(endpoint = %self.base_url, status = %response.status(), "bulk delete rejected");
                false
            }
            Err(e) => {
                error!(endpoint = %self.base_url, error = %Error::from(e), "bulk delete failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(base: &str, path: &str) -> RemoteEndpoint {
        RemoteEndpoint::new(base, path).unwrap()
    }

    #[test]
    fn test_urls_normalize_slashes() {
        let ep = endpoint("http://node1:5000/", "/v1/group/");
        assert_eq!(ep.base_url(), "http://node1:5000");
        assert_eq!(ep.resource_path(), "v1/group");
        assert_eq!(ep.collection_url(), "http://node1:5000/v1/group/");
        assert_eq!(ep.record_url("7"), "http://node1:5000/v1/group/7/");
    }

    #[test]
    fn test_record_url_escapes_id() {
        let ep = endpoint("http://node1:5000", "v1/group");
        assert_eq!(
            ep.record_url("a/b c?"),
            "http://node1:5000/v1/group/a%2Fb%20c%3F/"
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = OperationOutcome {
            endpoint: "http://n1".into(),
            result: Ok(()),
        };
        assert!(ok.is_success());
        assert!(ok.error().is_none());

        let failed = OperationOutcome {
            endpoint: "http://n2".into(),
            result: Err(Error::ConnectionFailed("refused".into())),
        };
        assert!(!failed.is_success());
        assert!(failed.error().unwrap().is_transport());
    }
}
