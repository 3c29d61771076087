//! Guarded with `#[cfg(test)]` from `lib.rs`

use std::collections::BTreeSet;

use anyhow::{anyhow, Result};
use maplit::btreeset;

use infra::ids::Id;
use infra::persistence::Storage;

use crate::customer::{Customers, Register};
use crate::menu::{Menu, Modifier, ModifierKind};
use crate::orders::{AddToCart, Cart, Orders, PaymentMethod, PlaceOrder, ShowCart, ShowOrder};
use crate::pricing::{FeeRules, Money};
use crate::services::{Commandable, Queryable};


#[test]
fn dinner_order_as_transaction_script() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let pool = junk_drawer::pool("dinner_order_as_transaction_script")?;
    let menu = Menu::new(pool.clone())?;
    menu.setup()?;
    let orders = Orders::new(pool.clone(), FeeRules::default())?;

    orders.execute(AddToCart {
        item_id: Id::hashed("Classic Burger"),
        quantity: 2,
        modifiers: BTreeSet::new(),
    })?;
    orders.execute(AddToCart {
        item_id: Id::hashed("Margarita Pizza"),
        quantity: 1,
        modifiers: BTreeSet::new(),
    })?;

    let view = orders.query(ShowCart)?;
    assert_eq!(view.totals.subtotal, Money::in_minor(8500));
    assert_eq!(view.totals.grand_total, Money::in_minor(9425));

    let placed = orders.execute(PlaceOrder {
        customer: None,
        address: "123 Main St, City".to_string(),
        payment: PaymentMethod::Card,
        notes: Some("ring the bell".to_string()),
    })?;
    assert_eq!(placed.totals, view.totals);

    let conn = pool.get()?;
    let leftover: Option<Cart> = conn.load(&Cart::session_id())?;
    assert!(leftover.is_none(), "cart should be gone: {:?}", leftover);

    let found = orders
        .query(ShowOrder(placed.meta.id))?
        .ok_or_else(|| anyhow!("order should be stored"))?;
    assert_eq!(found.number, placed.number);
    Ok(())
}

#[test]
fn a_dressed_up_burger_prices_through_checkout() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let pool = junk_drawer::pool("a_dressed_up_burger_prices_through_checkout")?;
    let menu = Menu::new(pool.clone())?;
    menu.setup()?;
    let orders = Orders::new(pool, FeeRules::default())?;

    let bacon = Modifier::hashed_id(ModifierKind::Extra, "Bacon");
    let cheese = Modifier::hashed_id(ModifierKind::Extra, "Extra Cheese");
    orders.execute(AddToCart {
        item_id: Id::hashed("Classic Burger"),
        quantity: 2,
        modifiers: btreeset! {bacon, cheese},
    })?;

    let view = orders.query(ShowCart)?;
    assert_eq!(view.lines[0].unit_price, Money::in_minor(3000));
    assert_eq!(view.totals.subtotal, Money::in_minor(6000));
    assert_eq!(view.totals.tax, Money::in_minor(300));
    assert_eq!(view.totals.grand_total, Money::in_minor(6800));

    let placed = orders.execute(PlaceOrder {
        customer: None,
        address: "123 Main St, City".to_string(),
        payment: PaymentMethod::Cash,
        notes: None,
    })?;
    assert_eq!(placed.totals.grand_total, Money::in_minor(6800));
    Ok(())
}

#[test]
fn registration_then_checkout_links_the_customer() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let pool = junk_drawer::pool("registration_then_checkout_links_the_customer")?;
    let menu = Menu::new(pool.clone())?;
    menu.setup()?;
    let customers = Customers::new(pool.clone())?;
    let orders = Orders::new(pool, FeeRules::default())?;

    let who = customers.execute(Register {
        name: "Ada".to_string(),
        surname: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "555-0100".to_string(),
        password: "letmein".to_string(),
        address: None,
    })?;

    orders.execute(AddToCart {
        item_id: Id::hashed("Chocolate Cake"),
        quantity: 1,
        modifiers: BTreeSet::new(),
    })?;
    let placed = orders.execute(PlaceOrder {
        customer: Some(who),
        address: "10 Analytical Row".to_string(),
        payment: PaymentMethod::Wallet,
        notes: None,
    })?;

    assert_eq!(placed.customer, Some(who));
    assert_eq!(placed.address, "10 Analytical Row");
    Ok(())
}
