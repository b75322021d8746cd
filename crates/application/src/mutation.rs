//! Mutations with declared, graph-derived invalidation.

use std::collections::BTreeSet;

use fundline_core::{AppError, AppResult};
use fundline_domain::Resource;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::api_client::ApiClient;
use crate::client_ports::{HttpMethod, HttpRequest, MultipartForm, RequestBody};
use crate::query_cache::QueryCache;

/// One write request and the resource it changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    resource: Resource,
    request: HttpRequest,
}

impl Mutation {
    /// Wraps a prepared request.
    #[must_use]
    pub fn new(resource: Resource, request: HttpRequest) -> Self {
        Self { resource, request }
    }

    /// `POST` with a JSON body.
    pub fn post<B>(resource: Resource, path: impl Into<String>, body: &B) -> AppResult<Self>
    where
        B: Serialize + ?Sized,
    {
        Ok(Self::new(
            resource,
            HttpRequest::new(HttpMethod::Post, path).with_body(RequestBody::Json(encode(body)?)),
        ))
    }

    /// `PUT` with a JSON body.
    pub fn put<B>(resource: Resource, path: impl Into<String>, body: &B) -> AppResult<Self>
    where
        B: Serialize + ?Sized,
    {
        Ok(Self::new(
            resource,
            HttpRequest::new(HttpMethod::Put, path).with_body(RequestBody::Json(encode(body)?)),
        ))
    }

    /// `DELETE`.
    #[must_use]
    pub fn delete(resource: Resource, path: impl Into<String>) -> Self {
        Self::new(resource, HttpRequest::new(HttpMethod::Delete, path))
    }

    /// Body-less `POST` action.
    #[must_use]
    pub fn action(resource: Resource, path: impl Into<String>) -> Self {
        Self::new(resource, HttpRequest::new(HttpMethod::Post, path))
    }

    /// Multipart upload.
    #[must_use]
    pub fn upload(resource: Resource, path: impl Into<String>, form: MultipartForm) -> Self {
        Self::new(
            resource,
            HttpRequest::new(HttpMethod::Post, path).with_body(RequestBody::Multipart(form)),
        )
    }

    /// Changed resource.
    #[must_use]
    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Underlying request.
    #[must_use]
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }
}

fn encode<B>(body: &B) -> AppResult<Value>
where
    B: Serialize + ?Sized,
{
    serde_json::to_value(body)
        .map_err(|error| AppError::Internal(format!("failed to encode mutation body: {error}")))
}

/// Executes mutations and invalidates `resource.invalidation_set()` on success.
/// Failures invalidate nothing; there is no rollback.
#[derive(Clone)]
pub struct MutationRunner {
    cache: QueryCache,
}

impl MutationRunner {
    /// Creates a runner over the shared cache.
    #[must_use]
    pub fn new(cache: QueryCache) -> Self {
        Self { cache }
    }

    /// Client used for requests.
    #[must_use]
    pub fn client(&self) -> &ApiClient {
        self.cache.client()
    }

    /// Shared cache.
    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Runs one mutation and returns the decoded response body.
    pub async fn run(&self, mutation: Mutation) -> AppResult<Value> {
        let resource = mutation.resource;
        let value = self.send(mutation).await?;
        self.invalidate(&resource.invalidation_set());
        Ok(value)
    }

    /// Runs mutations one after another and invalidates once.
    ///
    /// Stops at the first failure; resources changed by the requests that
    /// already succeeded are still invalidated before the error is returned.
    pub async fn run_batch(&self, mutations: Vec<Mutation>) -> AppResult<Vec<Value>> {
        let mut changed = BTreeSet::new();
        let mut results = Vec::with_capacity(mutations.len());

        for mutation in mutations {
            let resource = mutation.resource;
            match self.send(mutation).await {
                Ok(value) => {
                    changed.extend(resource.invalidation_set());
                    results.push(value);
                }
                Err(error) => {
                    self.invalidate(&changed);
                    return Err(error);
                }
            }
        }

        self.invalidate(&changed);
        Ok(results)
    }

    async fn send(&self, mutation: Mutation) -> AppResult<Value> {
        let method = mutation.request.method;
        let path = mutation.request.path.clone();
        let response = self.cache.client().execute(mutation.request).await?;
        info!(%method, %path, resource = %mutation.resource, "mutation applied");
        response
            .json_value()
            .map_err(|error| self.cache.client().report(error))
    }

    fn invalidate(&self, resources: &BTreeSet<Resource>) {
        if !resources.is_empty() {
            self.cache.invalidate_resources(resources);
        }
    }
}

#[cfg(test)]
mod tests {
    use fundline_domain::{QueryKey, Resource};
    use serde_json::json;

    use super::{Mutation, MutationRunner};
    use crate::client_ports::{HttpMethod, MultipartForm};
    use crate::query_cache::{QueryCache, QueryPolicy};
    use crate::test_support::Harness;

    async fn primed(harness: &Harness) -> MutationRunner {
        harness
            .transport
            .respond(HttpMethod::Get, "/cases", 200, json!({"cases": []}));
        harness
            .transport
            .respond(HttpMethod::Get, "/documents", 200, json!({"documents": []}));
        harness
            .transport
            .respond(HttpMethod::Get, "/dashboard/stats", 200, json!({}));
        let cache = QueryCache::new(harness.client.clone());
        cache
            .fetch(&QueryKey::root(Resource::Cases), &QueryPolicy::list())
            .await;
        cache
            .fetch(&QueryKey::root(Resource::Documents), &QueryPolicy::list())
            .await;
        cache
            .fetch(
                &QueryKey::root(Resource::DashboardStats),
                &QueryPolicy::dashboard(),
            )
            .await;
        MutationRunner::new(cache)
    }

    fn is_stale(runner: &MutationRunner, resource: Resource) -> bool {
        runner
            .cache()
            .peek(&QueryKey::root(resource))
            .is_some_and(|snapshot| snapshot.is_stale)
    }

    #[tokio::test]
    async fn creating_a_case_invalidates_list_and_dashboard() {
        let harness = Harness::signed_in();
        let runner = primed(&harness).await;
        harness
            .transport
            .respond(HttpMethod::Post, "/cases", 201, json!({"id": 10}));

        let mutation = Mutation::post(Resource::Cases, "/cases", &json!({"plaintiff_id": 1}));
        assert!(mutation.is_ok());
        let result = runner
            .run(mutation.unwrap_or_else(|_| unreachable!()))
            .await;

        assert_eq!(result.ok(), Some(json!({"id": 10})));
        assert!(is_stale(&runner, Resource::Cases));
        assert!(is_stale(&runner, Resource::DashboardStats));
        assert!(!is_stale(&runner, Resource::Documents));
    }

    #[tokio::test]
    async fn failed_mutation_invalidates_nothing() {
        let harness = Harness::signed_in();
        let runner = primed(&harness).await;
        harness
            .transport
            .respond(HttpMethod::Delete, "/cases/4", 409, json!({"detail": "Case is funded"}));

        let result = runner
            .run(Mutation::delete(Resource::Cases, "/cases/4"))
            .await;

        assert!(result.is_err());
        assert!(!is_stale(&runner, Resource::Cases));
        assert_eq!(harness.notifier.messages(), vec!["Case is funded".to_owned()]);
    }

    #[tokio::test]
    async fn batch_uploads_are_sequential_and_invalidate_once() {
        let harness = Harness::signed_in();
        let runner = primed(&harness).await;
        harness
            .transport
            .respond(HttpMethod::Post, "/documents/upload", 200, json!({"id": 1}));

        let uploads = ["a.pdf", "b.pdf"]
            .into_iter()
            .map(|name| {
                Mutation::upload(
                    Resource::Documents,
                    "/documents/upload",
                    MultipartForm::default().file("file", name, None, vec![1, 2, 3]),
                )
            })
            .collect();
        let result = runner.run_batch(uploads).await;

        assert_eq!(result.map(|values| values.len()).ok(), Some(2));
        assert_eq!(harness.transport.count(HttpMethod::Post, "/documents/upload"), 2);
        assert!(is_stale(&runner, Resource::Documents));
        assert!(is_stale(&runner, Resource::DashboardStats));
    }

    #[tokio::test]
    async fn batch_stops_at_first_failure() {
        let harness = Harness::signed_in();
        let runner = primed(&harness).await;
        harness
            .transport
            .respond(HttpMethod::Post, "/documents/upload", 200, json!({"id": 1}));
        harness
            .transport
            .respond(HttpMethod::Post, "/documents/upload", 500, json!({}));

        let uploads = (0..3)
            .map(|index| {
                Mutation::upload(
                    Resource::Documents,
                    "/documents/upload",
                    MultipartForm::default().file("file", format!("{index}.pdf"), None, Vec::new()),
                )
            })
            .collect();
        let result = runner.run_batch(uploads).await;

        assert!(result.is_err());
        assert_eq!(harness.transport.count(HttpMethod::Post, "/documents/upload"), 2);
        assert!(is_stale(&runner, Resource::Documents));
    }

    #[tokio::test]
    async fn batch_failing_on_the_first_request_invalidates_nothing() {
        let harness = Harness::signed_in();
        let runner = primed(&harness).await;
        harness
            .transport
            .respond(HttpMethod::Post, "/documents/upload", 500, json!({}));

        let uploads = (0..2)
            .map(|index| {
                Mutation::upload(
                    Resource::Documents,
                    "/documents/upload",
                    MultipartForm::default().file("file", format!("{index}.pdf"), None, Vec::new()),
                )
            })
            .collect();
        let result = runner.run_batch(uploads).await;

        assert!(result.is_err());
        assert_eq!(harness.transport.count(HttpMethod::Post, "/documents/upload"), 1);
        assert!(!is_stale(&runner, Resource::Documents));
        assert!(!is_stale(&runner, Resource::Cases));
    }
}
