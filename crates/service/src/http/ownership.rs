use std::convert::Infallible;

use axum::async_trait;
use axum::extract::{FromRequestParts, OriginalUri};
use http::request::Parts;

use common::prelude::{OwnershipAssertion, OWNERSHIP_HEADER};

/// The ownership header of a request, bound to its method and URL.
///
/// A missing or undecodable header is not a rejection: handlers decide how
/// to treat an unauthenticated request.
#[derive(Debug, Clone, Default)]
pub struct Ownership(pub Option<OwnershipAssertion>);

impl Ownership {
    pub fn assertion(&self) -> Option<&OwnershipAssertion> {
        self.0.as_ref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Ownership
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // signatures cover the URL as the client sent it, before any nesting
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| &original.0)
            .unwrap_or(&parts.uri);
        let url = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());

        let assertion = parts
            .headers
            .get(OWNERSHIP_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|header| OwnershipAssertion::from_header(header, parts.method.as_str(), url));

        Ok(Self(assertion))
    }
}
