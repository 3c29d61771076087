use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use err_derive::Error;
use serde::{Deserialize, Serialize};

use infra::documents::HasMeta;
use infra::ids::Id;

use crate::menu::{MenuItem, Modifier};
use crate::orders::{Cart, LineItem};

/// An amount in minor currency units; we never deal in fractions of
/// those, so totals stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Money(u64);

const BASIS_POINTS: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRules {
    tax_basis_points: u32,
    delivery_fee: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotal {
    pub subtotal: Money,
    pub tax: Money,
    pub delivery_fee: Money,
    pub grand_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error(display = "menu item not found: {}", _0)]
    ItemNotFound(Id<MenuItem>),
    #[error(display = "cart line not found: {}", _0)]
    LineNotFound(Id<LineItem>),
    #[error(display = "quantity must be at least 1; got {}", _0)]
    InvalidQuantity(u32),
}

/// A snapshot of the catalog keyed by id, so pricing a cart needs no
/// further trips to the store.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    items: HashMap<Id<MenuItem>, MenuItem>,
    modifiers: HashMap<Id<Modifier>, Modifier>,
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn in_minor(amount: u64) -> Self {
        Money(amount)
    }

    pub fn as_minor(self) -> u64 {
        self.0
    }

    pub fn times(self, quantity: u32) -> Money {
        Money(self.0 * u64::from(quantity))
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let digits = self.0.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(ch);
        }
        fmt.write_str(&out)
    }
}

impl FeeRules {
    pub fn new(tax_basis_points: u32, delivery_fee: Money) -> Self {
        FeeRules {
            tax_basis_points,
            delivery_fee,
        }
    }

    pub fn from_fraction(tax_rate: f64, delivery_fee: Money) -> Option<Self> {
        if !tax_rate.is_finite() || tax_rate < 0.0 || tax_rate > 1.0 {
            return None;
        }
        let tax_basis_points = (tax_rate * f64::from(BASIS_POINTS)).round() as u32;
        Some(FeeRules {
            tax_basis_points,
            delivery_fee,
        })
    }

    // Truncates toward zero; a partial minor unit of tax is never charged.
    pub fn tax_on(&self, subtotal: Money) -> Money {
        let scaled = u128::from(subtotal.as_minor()) * u128::from(self.tax_basis_points);
        Money::in_minor((scaled / u128::from(BASIS_POINTS)) as u64)
    }

    pub fn delivery_fee(&self) -> Money {
        self.delivery_fee
    }
}

impl Default for FeeRules {
    fn default() -> Self {
        FeeRules::new(500, Money::in_minor(500))
    }
}

impl OrderTotal {
    pub const ZERO: OrderTotal = OrderTotal {
        subtotal: Money::ZERO,
        tax: Money::ZERO,
        delivery_fee: Money::ZERO,
        grand_total: Money::ZERO,
    };
}

impl Default for OrderTotal {
    fn default() -> Self {
        OrderTotal::ZERO
    }
}

impl PriceBook {
    pub fn new<I, M>(items: I, modifiers: M) -> Self
    where
        I: IntoIterator<Item = MenuItem>,
        M: IntoIterator<Item = Modifier>,
    {
        let items = items
            .into_iter()
            .map(|item| (item.meta().id, item))
            .collect();
        let modifiers = modifiers
            .into_iter()
            .map(|modifier| (modifier.meta().id, modifier))
            .collect();
        PriceBook { items, modifiers }
    }

    pub fn item(&self, id: &Id<MenuItem>) -> Option<&MenuItem> {
        self.items.get(id)
    }

    pub fn modifier(&self, id: &Id<Modifier>) -> Option<&Modifier> {
        self.modifiers.get(id)
    }
}

/// Base price plus the deltas of every chosen modifier the book knows
/// about; ids the book cannot resolve are skipped rather than fatal.
pub fn unit_price(item: &MenuItem, modifiers: &BTreeSet<Id<Modifier>>, book: &PriceBook) -> Money {
    let extras: Money = modifiers
        .iter()
        .filter_map(|id| book.modifier(id))
        .map(|modifier| modifier.price_delta)
        .sum();
    item.price + extras
}

pub fn line_total(line: &LineItem, book: &PriceBook) -> Result<Money, OrderError> {
    let item = book
        .item(&line.item_id)
        .ok_or(OrderError::ItemNotFound(line.item_id))?;
    if line.quantity < 1 {
        return Err(OrderError::InvalidQuantity(line.quantity));
    }
    Ok(unit_price(item, &line.modifiers, book).times(line.quantity))
}

pub fn order_total(
    cart: &Cart,
    fees: &FeeRules,
    book: &PriceBook,
) -> Result<OrderTotal, OrderError> {
    let mut subtotal = Money::ZERO;
    for line in cart.lines() {
        subtotal += line_total(line, book)?;
    }
    let tax = fees.tax_on(subtotal);
    let delivery_fee = if cart.is_empty() {
        Money::ZERO
    } else {
        fees.delivery_fee()
    };
    let grand_total = subtotal + tax + delivery_fee;
    Ok(OrderTotal {
        subtotal,
        tax,
        delivery_fee,
        grand_total,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::menu::{Category, ModifierKind};
    use infra::ids::IdGen;
    use rand::random;

    fn sample_book() -> PriceBook {
        let burgers = Id::<Category>::hashed(&"Burgers");
        let pizza = Id::<Category>::hashed(&"Pizza");
        PriceBook::new(
            vec![
                MenuItem::new(
                    Id::hashed(&"Classic Burger"),
                    "Classic Burger",
                    Money::in_minor(2500),
                    burgers,
                    Some(4.5),
                ),
                MenuItem::new(
                    Id::hashed(&"Margarita Pizza"),
                    "Margarita Pizza",
                    Money::in_minor(3500),
                    pizza,
                    Some(4.7),
                ),
                MenuItem::new(
                    Id::hashed(&"Fresh Juice"),
                    "Fresh Juice",
                    Money::in_minor(800),
                    pizza,
                    Some(4.4),
                ),
            ],
            vec![
                Modifier::new(
                    Modifier::hashed_id(ModifierKind::Extra, "Bacon"),
                    "Bacon",
                    Money::in_minor(300),
                    ModifierKind::Extra,
                ),
                Modifier::new(
                    Modifier::hashed_id(ModifierKind::Side, "French Fries"),
                    "French Fries",
                    Money::in_minor(500),
                    ModifierKind::Side,
                ),
                Modifier::new(
                    Modifier::hashed_id(ModifierKind::Removal, "Pickles"),
                    "Pickles",
                    Money::ZERO,
                    ModifierKind::Removal,
                ),
            ],
        )
    }

    fn fees() -> FeeRules {
        FeeRules::from_fraction(0.05, Money::in_minor(500)).expect("fee rules")
    }

    #[test]
    fn prices_the_two_line_example() {
        let book = sample_book();
        let idgen = IdGen::new();
        let mut cart = Cart::empty(Cart::session_id());
        cart.add_line(Id::hashed(&"Classic Burger"), 2, BTreeSet::new(), &idgen)
            .expect("add burger");
        cart.add_line(Id::hashed(&"Margarita Pizza"), 1, BTreeSet::new(), &idgen)
            .expect("add pizza");

        let totals = order_total(&cart, &fees(), &book).expect("totals");

        assert_eq!(totals.subtotal, Money::in_minor(8500));
        assert_eq!(totals.tax, Money::in_minor(425));
        assert_eq!(totals.delivery_fee, Money::in_minor(500));
        assert_eq!(totals.grand_total, Money::in_minor(9425));
    }

    #[test]
    fn an_empty_cart_costs_nothing() {
        let cart = Cart::empty(Cart::session_id());

        let totals = order_total(&cart, &fees(), &sample_book()).expect("totals");

        assert_eq!(totals, OrderTotal::ZERO);
    }

    #[test]
    fn tax_truncates_partial_minor_units() {
        let book = PriceBook::new(
            vec![MenuItem::new(
                Id::hashed(&"Oddly Priced"),
                "Oddly Priced",
                Money::in_minor(8499),
                Id::hashed(&"Burgers"),
                None,
            )],
            vec![],
        );
        let idgen = IdGen::new();
        let mut cart = Cart::empty(Cart::session_id());
        cart.add_line(Id::hashed(&"Oddly Priced"), 1, BTreeSet::new(), &idgen)
            .expect("add");

        let totals = order_total(&cart, &fees(), &book).expect("totals");

        // 8499 * 0.05 = 424.95; the fractional 0.95 is dropped.
        assert_eq!(totals.tax, Money::in_minor(424));
    }

    #[test]
    fn modifiers_price_every_unit_of_the_line() {
        let book = sample_book();
        let idgen = IdGen::new();
        let mut cart = Cart::empty(Cart::session_id());
        let bacon = Modifier::hashed_id(ModifierKind::Extra, "Bacon");
        cart.add_line(
            Id::hashed(&"Classic Burger"),
            2,
            maplit::btreeset! {bacon},
            &idgen,
        )
        .expect("add");

        let line = &cart.lines()[0];
        assert_eq!(
            line_total(line, &book),
            Ok(Money::in_minor((2500 + 300) * 2))
        );
    }

    #[test]
    fn unknown_modifiers_are_ignored() {
        let book = sample_book();
        let idgen = IdGen::new();
        let mut with_unknown = Cart::empty(Cart::session_id());
        with_unknown
            .add_line(
                Id::hashed(&"Classic Burger"),
                1,
                maplit::btreeset! {random()},
                &idgen,
            )
            .expect("add");
        let mut without = Cart::empty(Cart::session_id());
        without
            .add_line(Id::hashed(&"Classic Burger"), 1, BTreeSet::new(), &idgen)
            .expect("add");

        assert_eq!(
            order_total(&with_unknown, &fees(), &book).expect("totals"),
            order_total(&without, &fees(), &book).expect("totals"),
        );
    }

    #[test]
    fn removals_carry_no_price_effect() {
        let book = sample_book();
        let idgen = IdGen::new();
        let pickles = Modifier::hashed_id(ModifierKind::Removal, "Pickles");
        let mut cart = Cart::empty(Cart::session_id());
        cart.add_line(
            Id::hashed(&"Classic Burger"),
            1,
            maplit::btreeset! {pickles},
            &idgen,
        )
        .expect("add");

        let line = &cart.lines()[0];
        assert_eq!(line_total(line, &book), Ok(Money::in_minor(2500)));
    }

    #[test]
    fn missing_items_are_an_error() {
        let book = sample_book();
        let idgen = IdGen::new();
        let nowhere = random::<Id<MenuItem>>();
        let line = LineItem {
            id: idgen.generate(),
            item_id: nowhere,
            quantity: 1,
            modifiers: BTreeSet::new(),
        };

        assert_eq!(line_total(&line, &book), Err(OrderError::ItemNotFound(nowhere)));
    }

    #[test]
    fn zero_quantities_are_an_error() {
        let book = sample_book();
        let idgen = IdGen::new();
        let line = LineItem {
            id: idgen.generate(),
            item_id: Id::hashed(&"Classic Burger"),
            quantity: 0,
            modifiers: BTreeSet::new(),
        };

        assert_eq!(line_total(&line, &book), Err(OrderError::InvalidQuantity(0)));
    }

    #[test]
    fn growing_a_quantity_never_shrinks_the_total() {
        let book = sample_book();
        let idgen = IdGen::new();
        let mut previous = Money::ZERO;
        for quantity in 1..=5 {
            let mut cart = Cart::empty(Cart::session_id());
            cart.add_line(
                Id::hashed(&"Fresh Juice"),
                quantity,
                BTreeSet::new(),
                &idgen,
            )
            .expect("add");
            let totals = order_total(&cart, &fees(), &book).expect("totals");
            assert!(
                totals.grand_total >= previous,
                "total {} for quantity {} fell below {}",
                totals.grand_total,
                quantity,
                previous
            );
            previous = totals.grand_total;
        }
    }

    #[test]
    fn cleared_carts_price_like_empty_ones() {
        let book = sample_book();
        let idgen = IdGen::new();
        let mut cart = Cart::empty(Cart::session_id());
        cart.add_line(Id::hashed(&"Classic Burger"), 2, BTreeSet::new(), &idgen)
            .expect("add");
        cart.clear();

        let totals = order_total(&cart, &fees(), &book).expect("totals");
        let empty = order_total(&Cart::empty(Cart::session_id()), &fees(), &book).expect("totals");

        assert_eq!(totals, empty);
    }

    #[test]
    fn rejects_nonsense_tax_rates() {
        assert_eq!(FeeRules::from_fraction(-0.01, Money::ZERO), None);
        assert_eq!(FeeRules::from_fraction(1.01, Money::ZERO), None);
        assert_eq!(FeeRules::from_fraction(std::f64::NAN, Money::ZERO), None);
    }

    #[test]
    fn displays_with_thousands_separators() {
        assert_eq!(Money::in_minor(500).to_string(), "500");
        assert_eq!(Money::in_minor(9425).to_string(), "9,425");
        assert_eq!(Money::in_minor(1_000_000).to_string(), "1,000,000");
    }
}
