mod models;

pub use self::models::{Category, MenuBoard, MenuItem, Modifier, ModifierKind};

use anyhow::{anyhow, Context, Result};
use log::*;
use r2d2::{self, Pool};

use infra::ids::Id;
use infra::persistence::Storage;

use crate::pricing::{Money, PriceBook};
use crate::services::{Queryable, Request};

// The catalog a fresh session starts from. Seeded ids are hashed from
// the names, so every session agrees on them.
const CATEGORIES: &[&str] = &["Burgers", "Pizza", "Chicken", "Desserts", "Drinks"];

const ITEMS: &[(&str, u64, &str, f32)] = &[
    ("Classic Burger", 2500, "Burgers", 4.5),
    ("Margarita Pizza", 3500, "Pizza", 4.7),
    ("Spicy Fried Chicken", 2800, "Chicken", 4.6),
    ("Chocolate Cake", 1500, "Desserts", 4.8),
    ("Fresh Juice", 800, "Drinks", 4.4),
    ("Double Cheeseburger", 3200, "Burgers", 4.6),
];

const MODIFIERS: &[(ModifierKind, &str, u64)] = &[
    (ModifierKind::Extra, "Extra Cheese", 200),
    (ModifierKind::Extra, "Bacon", 300),
    (ModifierKind::Extra, "Mushrooms", 150),
    (ModifierKind::Extra, "Onions", 100),
    (ModifierKind::Side, "French Fries", 500),
    (ModifierKind::Side, "Coleslaw", 300),
    (ModifierKind::Side, "Jalapeño Poppers", 400),
    (ModifierKind::Removal, "Pickles", 0),
    (ModifierKind::Removal, "Onions", 0),
    (ModifierKind::Removal, "Tomato", 0),
    (ModifierKind::Removal, "Lettuce", 0),
];

#[derive(Debug)]
pub struct Menu<M: r2d2::ManageConnection> {
    db: Pool<M>,
}

#[derive(Debug, Clone)]
pub struct ShowMenu;

#[derive(Debug, Clone)]
pub struct LookupItem(pub Id<MenuItem>);

#[derive(Debug, Clone)]
pub struct ItemsByCategory(pub Id<Category>);

#[derive(Debug, Clone)]
pub struct SearchItems {
    pub query: String,
    pub category: Option<Id<Category>>,
}

#[derive(Debug, Clone)]
pub struct ShowCategories;

#[derive(Debug, Clone)]
pub struct ShowModifiers;

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Menu<M> {
    pub fn new(db: Pool<M>) -> Result<Self> {
        Ok(Menu { db })
    }

    pub fn setup(&self) -> Result<()> {
        let conn = self.db.get()?;
        for name in CATEGORIES {
            Self::insert_category(&*conn, name)
                .with_context(|| format!("insert category {}", name))?;
        }
        for (name, price, category, rating) in ITEMS {
            Self::insert_item(&*conn, name, Money::in_minor(*price), category, *rating)
                .with_context(|| format!("insert item {}", name))?;
        }
        for (kind, name, delta) in MODIFIERS {
            Self::insert_modifier(&*conn, *kind, name, Money::in_minor(*delta))
                .with_context(|| format!("insert modifier {}", name))?;
        }
        info!(
            "Seeded menu with {} items across {} categories",
            ITEMS.len(),
            CATEGORIES.len()
        );
        Ok(())
    }

    fn insert_category(docs: &D, name: &str) -> Result<()> {
        let id = Id::hashed(name);
        let mut category = docs
            .load(&id)
            .context("load category")?
            .unwrap_or_else(|| Category::new(id, name));
        docs.save(&mut category).context("save category")?;

        on_board(docs, |board| {
            board.categories.insert(id);
        })?;
        debug!("Seeded category {}: {:?}", id, category.name);
        Ok(())
    }

    fn insert_item(docs: &D, name: &str, price: Money, category: &str, rating: f32) -> Result<()> {
        let id = Id::hashed(name);
        let category_id = Id::hashed(category);
        let mut item = docs
            .load(&id)
            .context("load item")?
            .unwrap_or_else(|| MenuItem::new(id, name, price, category_id, Some(rating)));
        docs.save(&mut item).context("save item")?;

        on_board(docs, |board| {
            board.items.insert(id);
        })?;
        debug!("Seeded item {}: {:?}", id, item.name);
        Ok(())
    }

    fn insert_modifier(docs: &D, kind: ModifierKind, name: &str, delta: Money) -> Result<()> {
        let id = Modifier::hashed_id(kind, name);
        let mut modifier = docs
            .load(&id)
            .context("load modifier")?
            .unwrap_or_else(|| Modifier::new(id, name, delta, kind));
        docs.save(&mut modifier).context("save modifier")?;

        on_board(docs, |board| {
            board.modifiers.insert(id);
        })?;
        debug!("Seeded modifier {}: {:?}", id, modifier.name);
        Ok(())
    }
}

fn on_board<D: Storage>(docs: &D, f: impl FnOnce(&mut MenuBoard)) -> Result<()> {
    let id = MenuBoard::id();
    let mut board = docs
        .load(&id)
        .context("load menu board")?
        .unwrap_or_else(|| MenuBoard::new(id));
    f(&mut board);
    docs.save(&mut board).context("save menu board")?;
    Ok(())
}

fn load_board<D: Storage>(docs: &D) -> Result<MenuBoard> {
    docs.load(&MenuBoard::id())
        .context("load menu board")?
        .ok_or_else(|| anyhow!("menu not seeded: {}", MenuBoard::id()))
}

fn load_items<D: Storage>(docs: &D) -> Result<Vec<MenuItem>> {
    let board = load_board(docs)?;
    let mut items = board
        .items
        .iter()
        .map(|id| {
            docs.load::<MenuItem>(id)
                .and_then(|item| item.ok_or_else(|| anyhow!("missing item? {}", id)))
        })
        .collect::<Result<Vec<MenuItem>>>()?;
    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(items)
}

fn load_categories<D: Storage>(docs: &D) -> Result<Vec<Category>> {
    let board = load_board(docs)?;
    let mut categories = board
        .categories
        .iter()
        .map(|id| {
            docs.load::<Category>(id)
                .and_then(|category| category.ok_or_else(|| anyhow!("missing category? {}", id)))
        })
        .collect::<Result<Vec<Category>>>()?;
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(categories)
}

fn load_modifiers<D: Storage>(docs: &D) -> Result<Vec<Modifier>> {
    let board = load_board(docs)?;
    let mut modifiers = board
        .modifiers
        .iter()
        .map(|id| {
            docs.load::<Modifier>(id)
                .and_then(|modifier| modifier.ok_or_else(|| anyhow!("missing modifier? {}", id)))
        })
        .collect::<Result<Vec<Modifier>>>()?;
    modifiers.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));
    Ok(modifiers)
}

pub(crate) fn price_book<D: Storage>(docs: &D) -> Result<PriceBook> {
    let items = load_items(docs)?;
    let modifiers = load_modifiers(docs)?;
    Ok(PriceBook::new(items, modifiers))
}

impl Request for ShowMenu {
    type Resp = Vec<MenuItem>;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Queryable<ShowMenu>
    for Menu<M>
{
    fn query(&self, _req: ShowMenu) -> Result<Vec<MenuItem>> {
        let conn = self.db.get()?;
        load_items(&*conn)
    }
}

impl Request for LookupItem {
    type Resp = Option<MenuItem>;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Queryable<LookupItem>
    for Menu<M>
{
    fn query(&self, LookupItem(id): LookupItem) -> Result<Option<MenuItem>> {
        let conn = self.db.get()?;
        let res = conn.load(&id)?;
        debug!("Load {} -> {:?}", id, res);
        Ok(res)
    }
}

impl Request for ItemsByCategory {
    type Resp = Vec<MenuItem>;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<ItemsByCategory> for Menu<M>
{
    fn query(&self, ItemsByCategory(category): ItemsByCategory) -> Result<Vec<MenuItem>> {
        let conn = self.db.get()?;
        let mut items = load_items(&*conn)?;
        items.retain(|item| item.category == category);
        Ok(items)
    }
}

impl Request for SearchItems {
    type Resp = Vec<MenuItem>;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Queryable<SearchItems>
    for Menu<M>
{
    fn query(&self, req: SearchItems) -> Result<Vec<MenuItem>> {
        let conn = self.db.get()?;
        let needle = req.query.to_lowercase();
        let mut items = load_items(&*conn)?;
        items.retain(|item| item.name.to_lowercase().contains(&needle));
        if let Some(category) = req.category {
            items.retain(|item| item.category == category);
        }
        debug!("Search {:?} found {} items", req.query, items.len());
        Ok(items)
    }
}

impl Request for ShowCategories {
    type Resp = Vec<Category>;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<ShowCategories> for Menu<M>
{
    fn query(&self, _req: ShowCategories) -> Result<Vec<Category>> {
        let conn = self.db.get()?;
        load_categories(&*conn)
    }
}

impl Request for ShowModifiers {
    type Resp = Vec<Modifier>;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<ShowModifiers> for Menu<M>
{
    fn query(&self, _req: ShowModifiers) -> Result<Vec<Modifier>> {
        let conn = self.db.get()?;
        load_modifiers(&*conn)
    }
}
