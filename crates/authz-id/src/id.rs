use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::base32;

/// A lexicographically sortable, time-ordered, globally unique identifier.
///
/// Layout (12 bytes, big-endian fields so byte order is numeric order):
/// 4 bytes unix seconds, 3 bytes machine id, 2 bytes process id, 3 bytes
/// per-process counter. Base32-encoded this is always 20 characters.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id([u8; 12]);

static MACHINE_ID: OnceLock<[u8; 3]> = OnceLock::new();
static COUNTER: AtomicU32 = AtomicU32::new(0);

fn machine_id() -> [u8; 3] {
    *MACHINE_ID.get_or_init(|| {
        use rand::RngCore;
        let mut bytes = [0u8; 3];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    })
}

impl Id {
    /// Generates a new ID. Monotonic within a single process modulo the
    /// 3-byte counter wrapping, which only matters past ~16M ids/second.
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;

        let pid = std::process::id() as u16;
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

        let machine = machine_id();
        let mut buf = [0u8; 12];
        buf[0..4].copy_from_slice(&secs.to_be_bytes());
        buf[4..7].copy_from_slice(&machine);
        buf[7..9].copy_from_slice(&pid.to_be_bytes());
        buf[9..12].copy_from_slice(&counter.to_be_bytes()[1..]);

        Id(buf)
    }

    pub fn from_bytes(b: [u8; 12]) -> Self {
        Id(b)
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 12]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseIdError {
    #[error("invalid id encoding: {0}")]
    Base32(#[from] base32::DecodeError),
    #[error("id must decode to 12 bytes, got {0}")]
    WrongLength(usize),
}

impl std::str::FromStr for Id {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = base32::decode(s)?;
        let len = bytes.len();
        let exact: [u8; 12] = bytes
            .try_into()
            .map_err(|_| ParseIdError::WrongLength(len))?;
        Ok(Id(exact))
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", base32::encode(&self.0))
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl serde::Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        format!("{self}").serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        let str_val = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        str_val
            .parse()
            .map_err(|err| D::Error::custom(format!("invalid id: {err}")))
    }
}

impl sqlx::Type<sqlx::Postgres> for Id {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for Id {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> sqlx::encode::IsNull {
        buf.extend_from_slice(self.to_string().as_bytes());
        sqlx::encode::IsNull::No
    }
}

impl sqlx::Decode<'_, sqlx::Postgres> for Id {
    fn decode(value: sqlx::postgres::PgValueRef<'_>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<'_, sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_round_trip() {
        let id = Id::generate();
        let s = id.to_string();
        assert_eq!(s.len(), 20);
        let parsed: Id = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn successive_ids_are_monotonic_within_a_process() {
        let a = Id::generate();
        let b = Id::generate();
        assert!(a.to_string() <= b.to_string());
        assert!(a <= b);
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!("not-an-id!".parse::<Id>().is_err());
        assert!("0".parse::<Id>().is_err());
    }
}
