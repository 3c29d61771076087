use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::bail;
use data_encoding::{BASE64URL_NOPAD, HEXLOWER};
use err_derive::Error;
use rand::distributions::{Distribution, Standard};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use siphasher::sip::SipHasher24;

// Sixteen bytes; the first eight are a big-endian timestamp in
// nanoseconds, the rest are entropy. Sorting by id sorts by time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UntypedId {
    pub(crate) val: [u8; 16],
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error(display = "Invalid prefix")]
    InvalidPrefix,
    #[error(display = "Unparseable Id")]
    Unparseable,
}

const TIMESTAMP_SIZE: usize = 8;

impl UntypedId {
    pub fn hashed(data: &[u8]) -> Self {
        let mut val = [0u8; 16];
        for i in 0..2u64 {
            let mut h = SipHasher24::new_with_keys(0, i);
            h.write(data);
            val[i as usize * 8..][..8].copy_from_slice(&h.finish().to_be_bytes());
        }
        UntypedId { val }
    }

    pub(crate) fn hashed_entity<H: Hash + ?Sized>(entity: &H) -> Self {
        let mut val = [0u8; 16];
        for i in 0..2u64 {
            let mut h = SipHasher24::new_with_keys(0, i);
            entity.hash(&mut h);
            val[i as usize * 8..][..8].copy_from_slice(&h.finish().to_be_bytes());
        }
        UntypedId { val }
    }

    pub(crate) fn generate() -> Self {
        UntypedId::at(SystemTime::now(), rand::random())
    }

    pub(crate) fn at(stamp: SystemTime, random: u64) -> Self {
        let nanos = stamp
            .duration_since(UNIX_EPOCH)
            .expect("system clock reads before the unix epoch")
            .as_nanos() as u64;
        let mut val = [0u8; 16];
        val[..TIMESTAMP_SIZE].copy_from_slice(&nanos.to_be_bytes());
        val[TIMESTAMP_SIZE..].copy_from_slice(&random.to_be_bytes());
        UntypedId { val }
    }

    pub fn timestamp(&self) -> SystemTime {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.val[..TIMESTAMP_SIZE]);
        UNIX_EPOCH + Duration::from_nanos(u64::from_be_bytes(buf))
    }

    pub fn random(&self) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.val[TIMESTAMP_SIZE..]);
        u64::from_be_bytes(buf)
    }
}

impl Distribution<UntypedId> for Standard {
    fn sample<R: ?Sized + rand::Rng>(&self, rng: &mut R) -> UntypedId {
        let val = rng.gen();
        UntypedId { val }
    }
}

impl fmt::Display for UntypedId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&BASE64URL_NOPAD.encode(&self.val))
    }
}

impl fmt::Debug for UntypedId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("UntypedId")
            .field("val", &format_args!("{}", HEXLOWER.encode(&self.val)))
            .finish()
    }
}

impl std::str::FromStr for UntypedId {
    type Err = anyhow::Error;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let decoded = BASE64URL_NOPAD
            .decode(src.as_bytes())
            .map_err(|_| IdParseError::Unparseable)?;
        let mut val = [0u8; 16];
        if decoded.len() != val.len() {
            bail!(IdParseError::Unparseable);
        }
        val.copy_from_slice(&decoded);
        Ok(UntypedId { val })
    }
}

impl Serialize for UntypedId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for UntypedId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdStrVisitor;
        impl<'vi> de::Visitor<'vi> for IdStrVisitor {
            type Value = UntypedId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "an id string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<UntypedId, E> {
                value.parse::<UntypedId>().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(IdStrVisitor)
    }
}
