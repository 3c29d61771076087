use anyhow::{Context, Result};
use log::*;
use r2d2::{self, Pool};
use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, HasMeta};
use infra::ids::{Entity, Id, IdGen};
use infra::persistence::Storage;

use crate::services::{Commandable, Request};
use crate::validate;

/// What the profile screen shows before anyone fills it in.
pub const DEFAULT_ADDRESS: &str = "123 Main St, City";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    #[serde(flatten)]
    pub(crate) meta: DocMeta<Customer>,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug)]
pub struct Customers<M: r2d2::ManageConnection> {
    db: Pool<M>,
    idgen: IdGen,
}

/// Registration details as the signup form collects them. The password
/// is checked and then dropped; nothing here stores it.
#[derive(Debug, Clone)]
pub struct Register {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub address: Option<String>,
}

impl Customer {
    pub(crate) fn incarnate(idgen: &IdGen, details: &Register) -> Self {
        let meta = DocMeta::new_with_id(idgen.generate());
        // A blank address counts as not given.
        let address = details
            .address
            .clone()
            .filter(|address| !address.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
        Customer {
            meta,
            name: details.name.clone(),
            surname: details.surname.clone(),
            email: details.email.clone(),
            phone: details.phone.clone(),
            address,
        }
    }
}

impl Entity for Customer {
    const PREFIX: &'static str = "customer";
}

impl HasMeta for Customer {
    fn meta(&self) -> &DocMeta<Customer> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Customer> {
        &mut self.meta
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Customers<M> {
    pub fn new(db: Pool<M>) -> Result<Self> {
        let idgen = IdGen::new();
        Ok(Customers { db, idgen })
    }
}

impl Request for Register {
    type Resp = Id<Customer>;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Commandable<Register>
    for Customers<M>
{
    fn execute(&self, req: Register) -> Result<Id<Customer>> {
        validate::required(&req.name, "name")?;
        validate::required(&req.surname, "surname")?;
        validate::required(&req.phone, "phone")?;
        validate::email(&req.email)?;
        validate::password(&req.password)?;

        let mut customer = Customer::incarnate(&self.idgen, &req);
        let conn = self.db.get()?;
        conn.save(&mut customer).context("save customer")?;
        info!("Registered customer {}", customer.meta.id);
        Ok(customer.meta.id)
    }
}
