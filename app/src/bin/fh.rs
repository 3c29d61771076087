use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::SecondsFormat;
use serde::Deserialize;
use structopt::StructOpt;

use infra::documents::HasMeta;
use infra::ids::Id;
use infra::persistence::DocumentConnectionManager;

use foodhub::customer::{Customer, Register};
use foodhub::menu::{
    ItemsByCategory, LookupItem, Menu, MenuItem, Modifier, SearchItems, ShowCategories, ShowMenu,
    ShowModifiers,
};
use foodhub::orders::{AddToCart, CartView, Order, PaymentMethod, PlaceOrder, ShowCart};
use foodhub::pricing::{Money, OrderTotal};
use foodhub::services::{Commandable, Queryable};
use foodhub::FoodHub;

#[derive(Debug, StructOpt)]
#[structopt(name = "fh", about = "FoodHub CLI")]
struct Opt {
    /// Config file; stock settings apply when omitted
    #[structopt(short = "c", long = "config", parse(from_os_str))]
    config: Option<PathBuf>,
    #[structopt(subcommand)]
    command: Commands,
}

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(name = "setup", about = "Seed the catalog")]
    Setup,
    #[structopt(name = "menu", about = "Show the menu, grouped by category")]
    Menu,
    #[structopt(name = "modifiers", about = "Show extras, sides and removals")]
    Modifiers,
    #[structopt(name = "search", about = "Search menu items by name")]
    Search(SearchOpts),
    #[structopt(name = "order", about = "Price a cart and optionally check out")]
    Order(OrderOpts),
    #[structopt(name = "register", about = "Register a customer")]
    Register(RegisterOpts),
}

#[derive(Debug, StructOpt)]
struct SearchOpts {
    query: String,
    #[structopt(long = "category")]
    category: Option<String>,
}

#[derive(Debug, StructOpt)]
struct OrderOpts {
    /// Lines like "Classic Burger", "Fresh Juice=2", or
    /// "Classic Burger=2+Bacon+extra:Onions"
    items: Vec<LineSpec>,
    #[structopt(long = "checkout")]
    checkout: bool,
    #[structopt(long = "address", default_value = "123 Main St, City")]
    address: String,
    /// card, wallet or cash
    #[structopt(long = "payment", default_value = "card")]
    payment: PaymentMethod,
    #[structopt(long = "notes")]
    notes: Option<String>,
    #[structopt(long = "customer")]
    customer: Option<Id<Customer>>,
}

#[derive(Debug, StructOpt)]
struct RegisterOpts {
    #[structopt(long = "name")]
    name: String,
    #[structopt(long = "surname")]
    surname: String,
    #[structopt(long = "email")]
    email: String,
    #[structopt(long = "phone")]
    phone: String,
    #[structopt(long = "password")]
    password: String,
    #[structopt(long = "address")]
    address: Option<String>,
}

/// One cart line as given on the command line: an item name, an
/// optional `=quantity`, and zero or more `+modifier` suffixes.
#[derive(Debug)]
struct LineSpec {
    name: String,
    quantity: u32,
    modifiers: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
struct Config {
    #[serde(flatten)]
    foodhub: foodhub::config::Config,
    #[serde(default)]
    env_logger: foodhub::config::EnvLogger,
}

impl FromStr for LineSpec {
    type Err = anyhow::Error;

    fn from_str(spec: &str) -> Result<Self> {
        let mut parts = spec.split('+');
        let head = parts.next().unwrap_or_default();
        let modifiers = parts
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>();

        let (name, quantity) = match head.find('=') {
            Some(at) => {
                let quantity = head[at + 1..]
                    .trim()
                    .parse::<u32>()
                    .with_context(|| format!("quantity in {:?}", spec))?;
                (head[..at].trim(), quantity)
            }
            None => (head.trim(), 1),
        };
        if name.is_empty() {
            return Err(anyhow!("missing item name in {:?}", spec));
        }

        Ok(LineSpec {
            name: name.to_string(),
            quantity,
            modifiers,
        })
    }
}

fn resolve_item(menu: &Menu<DocumentConnectionManager>, name: &str) -> Result<MenuItem> {
    if let Some(item) = menu.query(LookupItem(Id::hashed(name)))? {
        return Ok(item);
    }
    let mut found = menu.query(SearchItems {
        query: name.to_string(),
        category: None,
    })?;
    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(anyhow!("no menu item matches {:?}", name)),
        _ => {
            let names = found
                .iter()
                .map(|item| item.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Err(anyhow!("{:?} is ambiguous; could be any of: {}", name, names))
        }
    }
}

// "Onions" names both an extra and a removal, so a bare name can be
// ambiguous; "extra:Onions" or "removal:Onions" settles it.
fn resolve_modifier(all: &[Modifier], spec: &str) -> Result<Id<Modifier>> {
    let (kind, name) = match spec.find(':') {
        Some(at) => (Some(spec[..at].trim().to_lowercase()), spec[at + 1..].trim()),
        None => (None, spec.trim()),
    };
    let needle = name.to_lowercase();
    let matches = all
        .iter()
        .filter(|modifier| modifier.name.to_lowercase() == needle)
        .filter(|modifier| match kind.as_ref() {
            Some(kind) => modifier.kind.to_string() == *kind,
            None => true,
        })
        .collect::<Vec<_>>();
    match matches.as_slice() {
        [one] => Ok(one.meta().id),
        [] => Err(anyhow!("no modifier matches {:?}", spec)),
        many => Err(anyhow!(
            "{:?} is ambiguous; qualify it like {}:{}",
            spec,
            many[0].kind,
            many[0].name
        )),
    }
}

fn print_totals(totals: &OrderTotal, currency: &str) {
    println!("subtotal  {}{}", currency, totals.subtotal);
    println!("tax       {}{}", currency, totals.tax);
    println!("delivery  {}{}", currency, totals.delivery_fee);
    println!("total     {}{}", currency, totals.grand_total);
}

fn print_cart(view: &CartView, currency: &str) {
    for line in &view.lines {
        if line.modifiers.is_empty() {
            println!(
                "{:>3} x {} @ {}{} = {}{}",
                line.quantity, line.name, currency, line.unit_price, currency, line.line_total
            );
        } else {
            println!(
                "{:>3} x {} ({}) @ {}{} = {}{}",
                line.quantity,
                line.name,
                line.modifiers.join(", "),
                currency,
                line.unit_price,
                currency,
                line.line_total
            );
        }
    }
    print_totals(&view.totals, currency);
}

fn print_receipt(order: &Order, currency: &str) {
    println!(
        "order {} placed at {}",
        order.number,
        order.placed_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    println!("deliver to {} ({})", order.address, order.payment);
    if let Some(notes) = &order.notes {
        println!("notes: {}", notes);
    }
    print_totals(&order.totals, currency);
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let mut config = match &opt.config {
        Some(path) => {
            let mut buf = String::new();
            File::open(path)
                .with_context(|| format!("open {:?}", path))?
                .read_to_string(&mut buf)?;
            toml::from_str::<Config>(&buf)?
        }
        None => Config::default(),
    };
    config.env_logger.builder().init();
    config.foodhub.apply_env()?;

    let fh = FoodHub::new(&config.foodhub)?;
    // The store lives only as long as this process, so every run
    // starts from a freshly seeded catalog.
    fh.setup()?;
    let currency = &config.foodhub.currency;

    match opt.command {
        Commands::Setup => {
            let items = fh.menu()?.query(ShowMenu)?;
            println!("seeded {} menu items", items.len());
        }
        Commands::Menu => {
            let menu = fh.menu()?;
            for category in menu.query(ShowCategories)? {
                println!("{}", category.name);
                for item in menu.query(ItemsByCategory(category.meta().id))? {
                    match item.rating {
                        Some(rating) => println!(
                            "  {}: {} {}{} ({:.1})",
                            item.meta().id,
                            item.name,
                            currency,
                            item.price,
                            rating
                        ),
                        None => println!(
                            "  {}: {} {}{}",
                            item.meta().id,
                            item.name,
                            currency,
                            item.price
                        ),
                    }
                }
            }
        }
        Commands::Modifiers => {
            for modifier in fh.menu()?.query(ShowModifiers)? {
                if modifier.price_delta == Money::ZERO {
                    println!("{:<8} {}", modifier.kind.to_string(), modifier.name);
                } else {
                    println!(
                        "{:<8} {} (+{}{})",
                        modifier.kind.to_string(),
                        modifier.name,
                        currency,
                        modifier.price_delta
                    );
                }
            }
        }
        Commands::Search(opts) => {
            let found = fh.menu()?.query(SearchItems {
                query: opts.query,
                category: opts.category.map(|name| Id::hashed(&name)),
            })?;
            for item in found {
                println!("{}: {} {}{}", item.meta().id, item.name, currency, item.price);
            }
        }
        Commands::Order(opts) => {
            let menu = fh.menu()?;
            let orders = fh.orders()?;
            let all_modifiers = menu.query(ShowModifiers)?;

            for spec in &opts.items {
                let item = resolve_item(&menu, &spec.name)?;
                let modifiers = spec
                    .modifiers
                    .iter()
                    .map(|name| resolve_modifier(&all_modifiers, name))
                    .collect::<Result<BTreeSet<_>>>()?;
                orders.execute(AddToCart {
                    item_id: item.meta().id,
                    quantity: spec.quantity,
                    modifiers,
                })?;
            }

            let view = orders.query(ShowCart)?;
            print_cart(&view, currency);

            if opts.checkout {
                let placed = orders.execute(PlaceOrder {
                    customer: opts.customer,
                    address: opts.address,
                    payment: opts.payment,
                    notes: opts.notes,
                })?;
                println!();
                print_receipt(&placed, currency);
            }
        }
        Commands::Register(opts) => {
            let id = fh.customers()?.execute(Register {
                name: opts.name,
                surname: opts.surname,
                email: opts.email,
                phone: opts.phone,
                password: opts.password,
                address: opts.address,
            })?;
            println!("registered {}", id);
        }
    }

    Ok(())
}
