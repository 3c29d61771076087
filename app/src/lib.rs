use anyhow::{Context, Result};
use log::*;
use r2d2::Pool;

use infra::persistence::DocumentConnectionManager;

pub mod config;
pub mod customer;
pub mod menu;
pub mod orders;
pub mod pricing;
pub mod services;
pub mod validate;

#[cfg(test)]
mod test;

use crate::pricing::FeeRules;

/// The app rolled into one: a document store plus the services that
/// work against it.
#[derive(Debug, Clone)]
pub struct FoodHub {
    db: Pool<DocumentConnectionManager>,
    fees: FeeRules,
}

impl FoodHub {
    pub fn new(config: &config::Config) -> Result<Self> {
        let db = config.build()?;
        let fees = config.fees.rules()?;

        Ok(FoodHub { db, fees })
    }

    pub fn setup(&self) -> Result<()> {
        debug!("Seed catalog");
        self.menu()?.setup().context("seed menu")?;
        Ok(())
    }

    pub fn menu(&self) -> Result<menu::Menu<DocumentConnectionManager>> {
        menu::Menu::new(self.db.clone())
    }

    pub fn orders(&self) -> Result<orders::Orders<DocumentConnectionManager>> {
        orders::Orders::new(self.db.clone(), self.fees.clone())
    }

    pub fn customers(&self) -> Result<customer::Customers<DocumentConnectionManager>> {
        customer::Customers::new(self.db.clone())
    }
}
