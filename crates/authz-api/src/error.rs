use axum::response::IntoResponse;

/// The fundamental error type returned by every handler. Every core error is
/// canonicalized to a `tonic::Status` here — `tonic::Code` is reused purely
/// as a status vocabulary, no gRPC transport is involved — and this is the
/// only place in the crate that constructs one: the core raises, this shell
/// translates (authz-core never builds a `tonic::Status` itself).
#[derive(Debug)]
pub struct ApiError(pub tonic::Status);

impl From<authz_core::Error> for ApiError {
    fn from(err: authz_core::Error) -> Self {
        use authz_core::Error::*;

        let code = match err {
            NotFound => tonic::Code::NotFound,
            AlreadyExists => tonic::Code::AlreadyExists,
            RevisionMismatch => tonic::Code::Aborted,
            InvalidData(_) | InvalidParentId | InvalidKey | InvalidListArgs | InvalidStrategy => {
                tonic::Code::InvalidArgument
            }
            Timeout => tonic::Code::DeadlineExceeded,
            ConnectionUnavailable => tonic::Code::Unavailable,
        };

        ApiError(tonic::Status::new(code, err.to_string()))
    }
}

impl From<tonic::Status> for ApiError {
    fn from(status: tonic::Status) -> Self {
        ApiError(status)
    }
}

/// Maps a `tonic::Code` to the HTTP status a JSON caller expects, following
/// the same correspondence the grpc-gateway project documents between gRPC
/// codes and HTTP status codes.
fn code_to_http(code: tonic::Code) -> axum::http::StatusCode {
    use axum::http::StatusCode as S;
    use tonic::Code::*;

    match code {
        Ok => S::OK,
        Cancelled => S::from_u16(499).unwrap_or(S::INTERNAL_SERVER_ERROR),
        Unknown => S::INTERNAL_SERVER_ERROR,
        InvalidArgument => S::BAD_REQUEST,
        DeadlineExceeded => S::GATEWAY_TIMEOUT,
        NotFound => S::NOT_FOUND,
        AlreadyExists => S::CONFLICT,
        PermissionDenied => S::FORBIDDEN,
        Unauthenticated => S::UNAUTHORIZED,
        ResourceExhausted => S::TOO_MANY_REQUESTS,
        FailedPrecondition => S::BAD_REQUEST,
        Aborted => S::CONFLICT,
        OutOfRange => S::BAD_REQUEST,
        Unimplemented => S::NOT_IMPLEMENTED,
        Internal => S::INTERNAL_SERVER_ERROR,
        Unavailable => S::SERVICE_UNAVAILABLE,
        DataLoss => S::INTERNAL_SERVER_ERROR,
    }
}

#[derive(serde::Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = code_to_http(self.0.code());
        let body = ErrorBody {
            code: code_name(self.0.code()),
            message: self.0.message().to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_http_404() {
        let api_err: ApiError = authz_core::Error::NotFound.into();
        assert_eq!(code_to_http(api_err.0.code()), axum::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn already_exists_maps_to_http_409() {
        let api_err: ApiError = authz_core::Error::AlreadyExists.into();
        assert_eq!(code_to_http(api_err.0.code()), axum::http::StatusCode::CONFLICT);
    }

    #[test]
    fn invalid_data_maps_to_http_400() {
        let api_err: ApiError = authz_core::Error::InvalidData("bad attrs".into()).into();
        assert_eq!(code_to_http(api_err.0.code()), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn connection_unavailable_maps_to_http_503() {
        let api_err: ApiError = authz_core::Error::ConnectionUnavailable.into();
        assert_eq!(
            code_to_http(api_err.0.code()),
            axum::http::StatusCode::SERVICE_UNAVAILABLE
        );
    }
}

fn code_name(code: tonic::Code) -> &'static str {
    use tonic::Code::*;
    match code {
        Ok => "ok",
        Cancelled => "cancelled",
        Unknown => "unknown",
        InvalidArgument => "invalid_argument",
        DeadlineExceeded => "deadline_exceeded",
        NotFound => "not_found",
        AlreadyExists => "already_exists",
        PermissionDenied => "permission_denied",
        Unauthenticated => "unauthenticated",
        ResourceExhausted => "resource_exhausted",
        FailedPrecondition => "failed_precondition",
        Aborted => "aborted",
        OutOfRange => "out_of_range",
        Unimplemented => "unimplemented",
        Internal => "internal",
        Unavailable => "unavailable",
        DataLoss => "data_loss",
    }
}
