use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use anyhow::bail;
use rand::distributions::{Distribution, Standard};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::untyped_ids::{IdParseError, UntypedId};

pub struct Id<T> {
    val: UntypedId,
    phantom: PhantomData<T>,
}

pub trait Entity {
    const PREFIX: &'static str;
}

const DIVIDER: &str = "-";

#[derive(Debug, Clone, Default)]
pub struct IdGen {
    _priv: (),
}

impl IdGen {
    pub fn new() -> Self {
        IdGen { _priv: () }
    }

    pub fn untyped(&self) -> UntypedId {
        UntypedId::generate()
    }

    pub fn generate<T>(&self) -> Id<T> {
        self.untyped().typed()
    }
}

impl UntypedId {
    pub fn typed<T>(self) -> Id<T> {
        Id {
            val: self,
            phantom: PhantomData,
        }
    }
}

impl<T> Id<T> {
    pub fn hashed<H: Hash + ?Sized>(entity: &H) -> Self {
        UntypedId::hashed_entity(entity).typed()
    }

    pub fn untyped(&self) -> UntypedId {
        self.val
    }
}

impl<T> Distribution<Id<T>> for Standard {
    fn sample<R: ?Sized + rand::Rng>(&self, rng: &mut R) -> Id<T> {
        rng.gen::<UntypedId>().typed()
    }
}

impl<T: Entity> fmt::Display for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}{}{}", T::PREFIX, DIVIDER, self.val)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Id").field("val", &self.val).finish()
    }
}

impl<T: Entity> std::str::FromStr for Id<T> {
    type Err = anyhow::Error;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        if T::PREFIX.len() > src.len() {
            bail!(IdParseError::InvalidPrefix);
        };
        let (start, remainder) = src.split_at(T::PREFIX.len());
        if start != T::PREFIX {
            bail!(IdParseError::InvalidPrefix);
        }
        if remainder.is_empty() {
            bail!(IdParseError::Unparseable);
        }
        let (divider, b64) = remainder.split_at(1);

        if divider != DIVIDER {
            bail!(IdParseError::Unparseable);
        }

        let val = b64.parse::<UntypedId>()?;
        Ok(val.typed())
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        let val = Default::default();
        let phantom = PhantomData;
        Id { val, phantom }
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.val == other.val
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.val.cmp(&other.val)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.val.hash(state);
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Id {
            val: self.val,
            phantom: self.phantom,
        }
    }
}

impl<T> Copy for Id<T> {}

impl<T: Entity> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de, T: Entity> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdStrVisitor<T>(PhantomData<T>);
        impl<'vi, T: Entity> de::Visitor<'vi> for IdStrVisitor<T> {
            type Value = Id<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "an Id string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Id<T>, E> {
                value.parse::<Id<T>>().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(IdStrVisitor(PhantomData))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;

    #[derive(Debug)]
    struct Canary;

    impl Entity for Canary {
        const PREFIX: &'static str = "canary";
    }

    #[test]
    fn round_trips_via_to_from_str() {
        let id = IdGen::new().generate::<Canary>();
        let s = id.to_string();
        println!("String: {}", s);
        let id2 = s.parse::<Id<Canary>>().expect("parse id");
        assert_eq!(id, id2);
    }

    #[test]
    fn round_trips_via_serde_json() {
        let id = Id::<Canary>::hashed("cheep");

        let json = serde_json::to_string(&id).expect("serde_json::to_string");
        println!("Json: {}", json);
        let id2 = serde_json::from_str(&json).expect("serde_json::from_str");
        assert_eq!(id, id2);
    }

    #[test]
    fn serializes_to_string_like() {
        let id = Id::<Canary>::hashed("chirp");

        let json = serde_json::to_string(&id).expect("serde_json::to_string");
        let s: String = serde_json::from_str(&json).expect("serde_json::from_str");
        assert_eq!(id.to_string(), s);
    }

    #[test]
    fn hashes_are_stable() {
        assert_eq!(Id::<Canary>::hashed("Hi!"), Id::<Canary>::hashed("Hi!"));
        assert_ne!(Id::<Canary>::hashed("Hi!"), Id::<Canary>::hashed("Bye!"));
    }

    #[test]
    fn round_trips_via_untyped() {
        let idgen = IdGen::new();
        let id = idgen.generate::<Canary>();

        assert_eq!(id.untyped().typed::<Canary>(), id);
    }

    #[test]
    fn display_is_the_prefix_plus_the_untyped_form() {
        let id = rand::random::<Id<Canary>>();

        assert_eq!(id.to_string(), format!("canary-{}", id.untyped()));
    }

    #[test]
    fn parses_any_untyped_form_under_its_own_prefix() {
        let raw = rand::random::<UntypedId>();

        let id = format!("canary-{}", raw)
            .parse::<Id<Canary>>()
            .expect("parse id");

        assert_eq!(id.untyped(), raw);
    }

    #[test]
    fn should_allow_random_generation() {
        let id = rand::random::<Id<Canary>>();
        let id2 = rand::random::<Id<Canary>>();

        assert_ne!(id, id2);
    }

    #[test]
    fn ordering_follows_the_untyped_values() {
        let mut rng = rand::thread_rng();

        let id = rng.gen::<Id<Canary>>();
        let mut id2 = rng.gen::<Id<Canary>>();
        while id2 == id {
            id2 = rng.gen::<Id<Canary>>();
        }

        assert_eq!(id.cmp(&id2), id.untyped().cmp(&id2.untyped()));
    }

    #[test]
    fn should_verify_has_correct_entity_prefix() {
        let s = format!("wrongy-{}", rand::random::<UntypedId>());

        let result = s.parse::<Id<Canary>>();

        assert!(
            result.is_err(),
            "Parsing {:?} should return error; got {:?}",
            s,
            result,
        )
    }

    #[test]
    fn should_yield_useful_error_when_prefix_outruns_the_id() {
        #[derive(Debug)]
        struct Wordy;
        impl Entity for Wordy {
            // Longer than the candidate string in total, so the length guard trips.
            const PREFIX: &'static str = "a-prefix-longer-than-the-whole-id-string";
        }
        let s = format!("wordy-{}", rand::random::<UntypedId>());

        let result = s.parse::<Id<Wordy>>();

        assert!(
            result.is_err(),
            "Parsing {:?} should return error; got {:?}",
            s,
            result,
        )
    }

    #[test]
    fn should_yield_useful_error_when_just_prefix() {
        let result = "canary".parse::<Id<Canary>>();

        assert!(
            result.is_err(),
            "Parsing a bare prefix should return error; got {:?}",
            result,
        )
    }

    #[test]
    fn should_yield_useful_error_when_wrong_divider() {
        let s = format!("canary#{}", rand::random::<UntypedId>());

        let result = s.parse::<Id<Canary>>();

        assert!(
            result.is_err(),
            "Parsing {:?} should return error; got {:?}",
            s,
            result,
        )
    }
}
