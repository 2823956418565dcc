use serde::{Deserialize, Serialize};

/// Query parameters shared by every listing endpoint: an opaque page token
/// and a caller-requested page size.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page_token: Option<String>,
    pub page_size: Option<u16>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

/// Clamps a caller-requested page size to `[1, max]`, defaulting to `max`
/// when absent. `authz_core::clamp_limit` enforces its own fixed `[1, 30]`
/// bound internally for the principal/record stores; this lets the
/// configured `pagination_limit_max` additionally tighten that bound for
/// the tuple-listing endpoints, which call `TupleStore::list_left`/
/// `list_right` directly and so aren't clamped by the core.
pub fn clamp(requested: Option<u16>, max: u16) -> u16 {
    match requested {
        None | Some(0) => max,
        Some(n) => n.min(max),
    }
}

pub fn decode_cursor(token: Option<&str>) -> Option<String> {
    token.and_then(authz_core::pagination_decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_defaults_to_max_when_absent_or_zero() {
        assert_eq!(clamp(None, 30), 30);
        assert_eq!(clamp(Some(0), 30), 30);
    }

    #[test]
    fn clamp_never_exceeds_configured_max() {
        assert_eq!(clamp(Some(5), 30), 5);
        assert_eq!(clamp(Some(1000), 30), 30);
        assert_eq!(clamp(Some(1000), 10), 10);
    }

    #[test]
    fn decode_cursor_treats_garbage_as_absent() {
        assert_eq!(decode_cursor(Some("not-a-token")), None);
        assert_eq!(decode_cursor(None), None);
    }
}
