//! Canonical cache keys for backend queries.

use std::fmt::{Display, Formatter};

use url::form_urlencoded;

use crate::filters::{ListQuery, QueryParams};
use crate::resource::Resource;

/// Canonical identity of one cached query: endpoint plus sorted, encoded parameters.
///
/// Two queries for the same endpoint with the same parameters always produce
/// equal keys, whatever order the parameters were supplied in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    resource: Resource,
    canonical: String,
    path: String,
    params: Vec<(String, String)>,
}

impl QueryKey {
    /// Builds a key for `path` (relative to the API prefix) owned by `resource`.
    #[must_use]
    pub fn build(resource: Resource, path: impl Into<String>, params: &impl QueryParams) -> Self {
        let path = normalize_path(path.into());
        let mut params: Vec<(String, String)> = params
            .query_params()
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect();
        params.sort();

        let canonical = if params.is_empty() {
            path.clone()
        } else {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter())
                .finish();
            format!("{path}?{encoded}")
        };

        Self {
            resource,
            canonical,
            path,
            params,
        }
    }

    /// Builds the key for a resource's collection endpoint without parameters.
    #[must_use]
    pub fn root(resource: Resource) -> Self {
        Self::build(resource, resource.path(), &())
    }

    /// Builds the key for one page of a filtered list.
    #[must_use]
    pub fn list<F>(resource: Resource, query: &ListQuery<F>) -> Self
    where
        F: QueryParams,
    {
        Self::build(resource, resource.path(), query)
    }

    /// Returns the resource family this key belongs to.
    #[must_use]
    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Returns the endpoint path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Returns the sorted query parameters.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        self.params.as_slice()
    }

    /// Returns the canonical key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.canonical.as_str()
    }
}

impl Display for QueryKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.canonical.as_str())
    }
}

fn normalize_path(path: String) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::QueryKey;
    use crate::choices::{CaseStatus, CaseType};
    use crate::filters::{CaseFilter, ListQuery, QueryParams};
    use crate::resource::Resource;

    struct Unordered(Vec<(&'static str, String)>);

    impl QueryParams for Unordered {
        fn query_params(&self) -> Vec<(&'static str, String)> {
            self.0.clone()
        }
    }

    #[test]
    fn parameter_order_does_not_change_key() {
        let first = QueryKey::build(
            Resource::Cases,
            "/cases",
            &Unordered(vec![("status", "active".to_owned()), ("page", "1".to_owned())]),
        );
        let second = QueryKey::build(
            Resource::Cases,
            "cases/",
            &Unordered(vec![("page", "1".to_owned()), ("status", "active".to_owned())]),
        );

        assert_eq!(first, second);
        assert_eq!(first.as_str(), "/cases?page=1&status=active");
    }

    #[test]
    fn values_are_percent_encoded() {
        let key = QueryKey::build(
            Resource::Plaintiffs,
            "/plaintiffs",
            &Unordered(vec![("search", "doe & sons".to_owned())]),
        );
        assert_eq!(key.as_str(), "/plaintiffs?search=doe+%26+sons");
    }

    #[test]
    fn root_key_has_no_query_string() {
        assert_eq!(
            QueryKey::root(Resource::DashboardStats).as_str(),
            "/dashboard/stats"
        );
    }

    #[test]
    fn list_key_includes_page_and_limit() {
        let query = ListQuery::new(CaseFilter::default());
        assert_eq!(
            QueryKey::list(Resource::Cases, &query).as_str(),
            "/cases?limit=20&page=1"
        );
    }

    fn case_filter() -> impl Strategy<Value = CaseFilter> {
        (
            proptest::option::of("[a-z]{1,8}"),
            proptest::option::of(proptest::sample::select(CaseStatus::all().to_vec())),
            proptest::option::of(proptest::sample::select(CaseType::all().to_vec())),
        )
            .prop_map(|(search, status, case_type)| CaseFilter {
                search,
                status,
                case_type,
                priority: None,
            })
    }

    proptest! {
        #[test]
        fn filter_change_always_yields_new_key_on_page_one(
            before in case_filter(),
            after in case_filter(),
            page in 1_u32..50,
        ) {
            prop_assume!(before != after);

            let mut query = ListQuery::new(before);
            prop_assert!(query.set_page(page).is_ok());
            let previous = QueryKey::list(Resource::Cases, &query);

            query.set_filter(after);
            let next = QueryKey::list(Resource::Cases, &query);

            prop_assert_ne!(previous, next);
            prop_assert_eq!(query.pagination().page(), 1);
        }

        #[test]
        fn equal_filters_share_a_key(filter in case_filter()) {
            let first = QueryKey::list(Resource::Cases, &ListQuery::new(filter.clone()));
            let second = QueryKey::list(Resource::Cases, &ListQuery::new(filter));
            prop_assert_eq!(first, second);
        }
    }
}
