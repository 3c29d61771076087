mod models;

pub use self::models::{Cart, LineItem, Order, OrderNumber, PaymentMethod};

use std::collections::BTreeSet;

use anyhow::{bail, Context, Result};
use log::*;
use r2d2::{self, Pool};
use serde::Serialize;

use infra::ids::{Id, IdGen};
use infra::persistence::Storage;

use crate::customer::Customer;
use crate::menu::{self, MenuItem, Modifier};
use crate::pricing::{self, FeeRules, Money, OrderError, OrderTotal, PriceBook};
use crate::services::{Commandable, Queryable, Request};

/// The order desk. Holds the session's cart, prices it against the
/// menu, and turns it into a placed order at checkout.
#[derive(Debug)]
pub struct Orders<M: r2d2::ManageConnection> {
    db: Pool<M>,
    fees: FeeRules,
    idgen: IdGen,
}

#[derive(Debug, Clone)]
pub struct AddToCart {
    pub item_id: Id<MenuItem>,
    pub quantity: u32,
    pub modifiers: BTreeSet<Id<Modifier>>,
}

#[derive(Debug, Clone)]
pub struct AdjustQuantity {
    pub line_id: Id<LineItem>,
    pub delta: i32,
}

#[derive(Debug, Clone)]
pub struct RemoveLine(pub Id<LineItem>);

#[derive(Debug, Clone)]
pub struct ClearCart;

#[derive(Debug, Clone)]
pub struct ShowCart;

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub customer: Option<Id<Customer>>,
    pub address: String,
    pub payment: PaymentMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ShowOrder(pub Id<Order>);

/// A cart line as shown to the customer, with names and prices already
/// resolved against the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineView {
    pub line_id: Id<LineItem>,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub modifiers: Vec<String>,
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub lines: Vec<LineView>,
    pub totals: OrderTotal,
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Orders<M> {
    pub fn new(db: Pool<M>, fees: FeeRules) -> Result<Self> {
        let idgen = IdGen::new();
        Ok(Orders { db, fees, idgen })
    }

    fn with_cart<R>(&self, f: impl FnOnce(&mut Cart) -> Result<R>) -> Result<R> {
        let conn = self.db.get()?;
        let id = Cart::session_id();
        let mut cart = conn
            .load(&id)
            .context("load cart")?
            .unwrap_or_else(|| Cart::empty(id));
        let res = f(&mut cart)?;
        conn.save(&mut cart).context("save cart")?;
        Ok(res)
    }
}

fn cart_view(cart: &Cart, fees: &FeeRules, book: &PriceBook) -> Result<CartView> {
    let mut lines = Vec::with_capacity(cart.lines().len());
    for line in cart.lines() {
        let item = book
            .item(&line.item_id)
            .ok_or(OrderError::ItemNotFound(line.item_id))?;
        let mut modifiers = line
            .modifiers
            .iter()
            .filter_map(|id| book.modifier(id))
            .map(|modifier| modifier.name.clone())
            .collect::<Vec<_>>();
        modifiers.sort();
        lines.push(LineView {
            line_id: line.id,
            name: item.name.clone(),
            quantity: line.quantity,
            unit_price: pricing::unit_price(item, &line.modifiers, book),
            modifiers,
            line_total: pricing::line_total(line, book)?,
        });
    }
    let totals = pricing::order_total(cart, fees, book)?;
    Ok(CartView { lines, totals })
}

impl Request for AddToCart {
    type Resp = Id<LineItem>;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Commandable<AddToCart>
    for Orders<M>
{
    fn execute(&self, req: AddToCart) -> Result<Id<LineItem>> {
        let AddToCart {
            item_id,
            quantity,
            modifiers,
        } = req;

        let book = {
            let conn = self.db.get()?;
            if conn.load::<MenuItem>(&item_id)?.is_none() {
                bail!(OrderError::ItemNotFound(item_id));
            }
            menu::price_book(&*conn)?
        };

        // Tolerate stale clients: an id the menu no longer lists is
        // dropped here rather than poisoning the cart.
        let known = modifiers
            .into_iter()
            .filter(|id| {
                let keep = book.modifier(id).is_some();
                if !keep {
                    warn!("Dropping unknown modifier {} from cart add", id);
                }
                keep
            })
            .collect::<BTreeSet<_>>();

        let line_id =
            self.with_cart(|cart| Ok(cart.add_line(item_id, quantity, known, &self.idgen)?))?;
        debug!("Added {} x{} as line {}", item_id, quantity, line_id);
        Ok(line_id)
    }
}

impl Request for AdjustQuantity {
    type Resp = ();
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<AdjustQuantity> for Orders<M>
{
    fn execute(&self, req: AdjustQuantity) -> Result<()> {
        self.with_cart(|cart| {
            cart.adjust_quantity(req.line_id, req.delta)?;
            Ok(())
        })
    }
}

impl Request for RemoveLine {
    type Resp = ();
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Commandable<RemoveLine>
    for Orders<M>
{
    fn execute(&self, RemoveLine(line_id): RemoveLine) -> Result<()> {
        self.with_cart(|cart| {
            cart.remove_line(line_id)?;
            Ok(())
        })
    }
}

impl Request for ClearCart {
    type Resp = ();
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Commandable<ClearCart>
    for Orders<M>
{
    fn execute(&self, _req: ClearCart) -> Result<()> {
        self.with_cart(|cart| {
            cart.clear();
            Ok(())
        })
    }
}

impl Request for ShowCart {
    type Resp = CartView;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Queryable<ShowCart>
    for Orders<M>
{
    fn query(&self, _req: ShowCart) -> Result<CartView> {
        let conn = self.db.get()?;
        let id = Cart::session_id();
        let cart = conn
            .load(&id)
            .context("load cart")?
            .unwrap_or_else(|| Cart::empty(id));
        let book = menu::price_book(&*conn)?;
        cart_view(&cart, &self.fees, &book)
    }
}

impl Request for PlaceOrder {
    type Resp = Order;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Commandable<PlaceOrder>
    for Orders<M>
{
    fn execute(&self, req: PlaceOrder) -> Result<Order> {
        let conn = self.db.get()?;
        let id = Cart::session_id();
        let cart: Cart = conn
            .load(&id)
            .context("load cart")?
            .unwrap_or_else(|| Cart::empty(id));
        if cart.is_empty() {
            bail!("cannot place an order from an empty cart");
        }

        let book = menu::price_book(&*conn)?;
        let totals = pricing::order_total(&cart, &self.fees, &book)?;
        let mut order = Order::place(&cart, totals, req, &self.idgen);
        conn.save(&mut order).context("save order")?;
        conn.delete(&id).context("clear cart")?;
        info!(
            "Placed order {} ({}) totalling {}",
            order.number,
            order.meta.id,
            order.totals.grand_total
        );
        Ok(order)
    }
}

impl Request for ShowOrder {
    type Resp = Option<Order>;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Queryable<ShowOrder>
    for Orders<M>
{
    fn query(&self, ShowOrder(id): ShowOrder) -> Result<Option<Order>> {
        let conn = self.db.get()?;
        let res = conn.load(&id)?;
        debug!("Load {} -> {:?}", id, res);
        Ok(res)
    }
}
