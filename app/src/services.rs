use anyhow::Result;

/// A message one of our services understands, along with the reply it
/// produces; asking the menu for an item yields that item, while asking
/// the order desk to add to the cart yields the affected line's id.
pub trait Request {
    type Resp;
}

pub trait Queryable<Req>
where
    Req: Request,
{
    fn query(&self, req: Req) -> Result<Req::Resp>;
}

pub trait Commandable<Req>
where
    Req: Request,
{
    fn execute(&self, req: Req) -> Result<Req::Resp>;
}
