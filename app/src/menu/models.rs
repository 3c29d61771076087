use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, HasMeta};
use infra::ids::{Entity, Id};

use crate::pricing::Money;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MenuItem {
    #[serde(flatten)]
    pub(crate) meta: DocMeta<MenuItem>,
    pub name: String,
    pub price: Money,
    pub category: Id<Category>,
    #[serde(default)]
    pub rating: Option<f32>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Category {
    #[serde(flatten)]
    pub(crate) meta: DocMeta<Category>,
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKind {
    Extra,
    Side,
    Removal,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Modifier {
    #[serde(flatten)]
    pub(crate) meta: DocMeta<Modifier>,
    pub name: String,
    pub price_delta: Money,
    pub kind: ModifierKind,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MenuBoard {
    #[serde(flatten)]
    pub(crate) meta: DocMeta<MenuBoard>,
    pub(crate) items: BTreeSet<Id<MenuItem>>,
    pub(crate) categories: BTreeSet<Id<Category>>,
    pub(crate) modifiers: BTreeSet<Id<Modifier>>,
}

impl MenuItem {
    pub(crate) fn new(
        id: Id<MenuItem>,
        name: &str,
        price: Money,
        category: Id<Category>,
        rating: Option<f32>,
    ) -> Self {
        let meta = DocMeta::new_with_id(id);
        let name = name.to_string();
        MenuItem {
            meta,
            name,
            price,
            category,
            rating,
        }
    }
}

impl Category {
    pub(crate) fn new(id: Id<Category>, name: &str) -> Self {
        let meta = DocMeta::new_with_id(id);
        let name = name.to_string();
        Category { meta, name }
    }
}

impl Modifier {
    pub(crate) fn new(
        id: Id<Modifier>,
        name: &str,
        price_delta: Money,
        kind: ModifierKind,
    ) -> Self {
        let meta = DocMeta::new_with_id(id);
        let name = name.to_string();
        Modifier {
            meta,
            name,
            price_delta,
            kind,
        }
    }

    // An extra and a removal can share a display name ("Onions"), so the
    // hash covers the kind as well.
    pub(crate) fn hashed_id(kind: ModifierKind, name: &str) -> Id<Modifier> {
        Id::hashed(&(kind, name))
    }
}

impl MenuBoard {
    pub(crate) fn new(id: Id<MenuBoard>) -> Self {
        let meta = DocMeta::new_with_id(id);
        MenuBoard {
            meta,
            items: BTreeSet::new(),
            categories: BTreeSet::new(),
            modifiers: BTreeSet::new(),
        }
    }

    pub(crate) fn id() -> Id<MenuBoard> {
        Id::hashed("MenuBoard")
    }
}

impl fmt::Display for ModifierKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModifierKind::Extra => write!(fmt, "extra"),
            ModifierKind::Side => write!(fmt, "side"),
            ModifierKind::Removal => write!(fmt, "removal"),
        }
    }
}

impl Entity for MenuItem {
    const PREFIX: &'static str = "item";
}

impl HasMeta for MenuItem {
    fn meta(&self) -> &DocMeta<Self> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Self> {
        &mut self.meta
    }
}

impl Entity for Category {
    const PREFIX: &'static str = "category";
}

impl HasMeta for Category {
    fn meta(&self) -> &DocMeta<Self> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Self> {
        &mut self.meta
    }
}

impl Entity for Modifier {
    const PREFIX: &'static str = "modifier";
}

impl HasMeta for Modifier {
    fn meta(&self) -> &DocMeta<Self> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Self> {
        &mut self.meta
    }
}

impl Entity for MenuBoard {
    const PREFIX: &'static str = "menu-board";
}

impl HasMeta for MenuBoard {
    fn meta(&self) -> &DocMeta<Self> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Self> {
        &mut self.meta
    }
}
