use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, HasMeta};
use infra::ids::{Entity, Id, IdGen};

use crate::customer::Customer;
use crate::menu::{MenuItem, Modifier};
use crate::pricing::{OrderError, OrderTotal};

/// A single row of the cart: one menu item at some quantity, plus the
/// modifiers it was configured with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItem {
    pub(crate) id: Id<LineItem>,
    pub(crate) item_id: Id<MenuItem>,
    pub(crate) quantity: u32,
    #[serde(default)]
    pub(crate) modifiers: BTreeSet<Id<Modifier>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    #[serde(flatten)]
    pub(crate) meta: DocMeta<Cart>,
    #[serde(default)]
    pub(crate) lines: Vec<LineItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Wallet,
    Cash,
}

/// The number customers quote when they ask after an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(flatten)]
    pub(crate) meta: DocMeta<Order>,
    pub number: OrderNumber,
    #[serde(default)]
    pub customer: Option<Id<Customer>>,
    pub lines: Vec<LineItem>,
    pub totals: OrderTotal,
    pub address: String,
    pub payment: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
    pub placed_at: DateTime<Utc>,
}

impl Cart {
    pub(crate) fn empty(id: Id<Cart>) -> Self {
        let meta = DocMeta::new_with_id(id);
        let lines = Vec::new();
        Cart { meta, lines }
    }

    // One cart per session; every service in the process shares it.
    pub(crate) fn session_id() -> Id<Cart> {
        Id::hashed("Cart")
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds an item to the cart, or bumps the quantity of an existing
    /// line when the item and modifier set match one already there.
    /// Merged quantities saturate at `u32::MAX`.
    pub(crate) fn add_line(
        &mut self,
        item_id: Id<MenuItem>,
        quantity: u32,
        modifiers: BTreeSet<Id<Modifier>>,
        idgen: &IdGen,
    ) -> Result<Id<LineItem>, OrderError> {
        if quantity < 1 {
            return Err(OrderError::InvalidQuantity(quantity));
        }

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.item_id == item_id && line.modifiers == modifiers)
        {
            line.quantity = line.quantity.saturating_add(quantity);
            return Ok(line.id);
        }

        let id = idgen.generate();
        let line = LineItem {
            id,
            item_id,
            quantity,
            modifiers,
        };
        self.lines.push(line);
        Ok(id)
    }

    /// Applies a signed change to a line's quantity. Dropping to zero or
    /// below removes the line outright; increases cap at `u32::MAX`.
    pub(crate) fn adjust_quantity(
        &mut self,
        line_id: Id<LineItem>,
        delta: i32,
    ) -> Result<(), OrderError> {
        let position = self
            .lines
            .iter()
            .position(|line| line.id == line_id)
            .ok_or(OrderError::LineNotFound(line_id))?;

        let quantity = i64::from(self.lines[position].quantity) + i64::from(delta);
        if quantity <= 0 {
            self.lines.remove(position);
        } else {
            self.lines[position].quantity = quantity.min(i64::from(u32::MAX)) as u32;
        }
        Ok(())
    }

    pub(crate) fn remove_line(&mut self, line_id: Id<LineItem>) -> Result<(), OrderError> {
        let position = self
            .lines
            .iter()
            .position(|line| line.id == line_id)
            .ok_or(OrderError::LineNotFound(line_id))?;
        self.lines.remove(position);
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Order {
    pub(crate) fn place(
        cart: &Cart,
        totals: OrderTotal,
        details: super::PlaceOrder,
        idgen: &IdGen,
    ) -> Self {
        let super::PlaceOrder {
            customer,
            address,
            payment,
            notes,
        } = details;
        let meta = DocMeta::new_with_id(idgen.generate());
        let number = OrderNumber::generate(&mut rand::thread_rng());
        let lines = cart.lines.clone();
        let placed_at = Utc::now();
        Order {
            meta,
            number,
            customer,
            lines,
            totals,
            address,
            payment,
            notes,
            placed_at,
        }
    }
}

impl OrderNumber {
    // Eight digits, like the confirmation screens show.
    pub(crate) fn generate<R: Rng>(rng: &mut R) -> Self {
        OrderNumber(rng.gen_range(10_000_000, 100_000_000))
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Cash => "cash",
        };
        write!(fmt, "{}", name)
    }
}

impl FromStr for PaymentMethod {
    type Err = anyhow::Error;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        match src.to_lowercase().as_str() {
            "card" => Ok(PaymentMethod::Card),
            "wallet" => Ok(PaymentMethod::Wallet),
            "cash" => Ok(PaymentMethod::Cash),
            other => Err(anyhow!("unknown payment method: {:?}", other)),
        }
    }
}

impl Entity for LineItem {
    const PREFIX: &'static str = "line";
}

impl Entity for Cart {
    const PREFIX: &'static str = "cart";
}

impl HasMeta for Cart {
    fn meta(&self) -> &DocMeta<Self> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Self> {
        &mut self.meta
    }
}

impl Entity for Order {
    const PREFIX: &'static str = "order";
}

impl HasMeta for Order {
    fn meta(&self) -> &DocMeta<Self> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Self> {
        &mut self.meta
    }
}
