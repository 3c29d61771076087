use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::ids::{Entity, Id};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default, Hash)]
pub struct Version(String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(bound = "T: Entity")]
pub struct DocMeta<T> {
    #[serde(rename = "_id")]
    pub id: Id<T>,
    #[serde(rename = "_version")]
    pub version: Version,
    #[serde(skip)]
    pub _phantom: PhantomData<T>,
}

// Documents carry their version alongside their content, so that an
// update can say which revision it expects to replace.
pub trait HasMeta: Sized {
    fn meta(&self) -> &DocMeta<Self>;
    fn meta_mut(&mut self) -> &mut DocMeta<Self>;
}

impl Version {
    pub fn is_initial(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn from_sequence(seq: u64) -> Self {
        Version(format!("{:x}", seq))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T> Default for DocMeta<T> {
    fn default() -> Self {
        let id = Default::default();
        let version = Default::default();
        let _phantom = Default::default();
        DocMeta {
            id,
            version,
            _phantom,
        }
    }
}

impl<T> DocMeta<T> {
    pub fn new_with_id(id: Id<T>) -> Self {
        DocMeta {
            id,
            ..Default::default()
        }
    }
}

impl std::str::FromStr for Version {
    type Err = anyhow::Error;
    fn from_str(val: &str) -> Result<Self, Self::Err> {
        let version = val.to_string();
        Ok(Version(version))
    }
}
