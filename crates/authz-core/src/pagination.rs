use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u16 = 30;
pub const MAX_LIMIT: u16 = 30;

/// Clamps a caller-supplied page size to `[1, MAX_LIMIT]`, defaulting to
/// `DEFAULT_LIMIT` when the caller didn't supply one (represented as 0).
pub fn clamp_limit(requested: u16) -> u16 {
    if requested == 0 {
        DEFAULT_LIMIT
    } else {
        requested.min(MAX_LIMIT)
    }
}

/// The payload carried by an opaque pagination token: the endpoint id of
/// the last row of the previous page, used as an exclusive cursor.
#[derive(Serialize, Deserialize)]
struct Token {
    last_id: String,
}

/// Encodes `last_id` as a base32 token.
pub fn encode(last_id: &str) -> String {
    let payload = Token {
        last_id: last_id.to_string(),
    };
    // A tiny hand-rolled length-prefixed encoding stands in for the
    // original's single-field protobuf message; there's no wire-compat
    // requirement on this token, only "opaque and round-trips".
    let bytes = serialize(&payload);
    authz_id::base32::encode(&bytes)
}

/// Decodes a pagination token back to a `last_id`. A token that doesn't
/// decode cleanly is treated as "no cursor" (start from the beginning)
/// rather than a hard error, matching the original's guarded parse.
pub fn decode(token: &str) -> Option<String> {
    let bytes = authz_id::base32::decode(token).ok()?;
    deserialize(&bytes).map(|t| t.last_id)
}

fn serialize(token: &Token) -> Vec<u8> {
    let bytes = token.last_id.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() + 4);
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
    out
}

fn deserialize(bytes: &[u8]) -> Option<Token> {
    if bytes.len() < 4 {
        return None;
    }
    let len = u32::from_be_bytes(bytes[0..4].try_into().ok()?) as usize;
    let rest = &bytes[4..];
    if rest.len() != len {
        return None;
    }
    let last_id = String::from_utf8(rest.to_vec()).ok()?;
    Some(Token { last_id })
}

/// Builds the token to return for a page of results, following the rule
/// "emitted iff the page was full".
pub fn token_for_page(last_id: Option<&str>, page_len: usize, limit: u16) -> Option<String> {
    if page_len == limit as usize {
        last_id.map(encode)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_last_id() {
        let token = encode("user:jane");
        assert_eq!(decode(&token).as_deref(), Some("user:jane"));
    }

    #[test]
    fn malformed_token_decodes_to_none() {
        assert_eq!(decode("not-a-real-token"), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn clamp_limit_enforces_bounds_and_default() {
        assert_eq!(clamp_limit(0), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(5), 5);
        assert_eq!(clamp_limit(1000), MAX_LIMIT);
    }

    #[test]
    fn token_emitted_only_when_page_is_full() {
        assert!(token_for_page(Some("x"), 3, 3).is_some());
        assert!(token_for_page(Some("x"), 2, 3).is_none());
    }
}
