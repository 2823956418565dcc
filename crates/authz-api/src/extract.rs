use axum::extract::FromRequestParts;
use axum::http::request::Parts;

pub const SPACE_ID_HEADER: &str = "space-id";

/// The `space-id` request header: the logical tenant partition key. Missing
/// or non-UTF8 falls back to the empty string (the default space), matching
/// the "stateless, metadata-carried" contract rather than rejecting the
/// request outright.
#[derive(Clone, Debug, Default)]
pub struct SpaceId(pub String);

impl<S> FromRequestParts<S> for SpaceId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let space_id = parts
            .headers
            .get(SPACE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        async move { Ok(SpaceId(space_id)) }
    }
}
