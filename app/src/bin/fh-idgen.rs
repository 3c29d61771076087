use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use structopt::StructOpt;

use infra::ids::IdGen;
use infra::untyped_ids::UntypedId;

#[derive(Debug, StructOpt)]
#[structopt(name = "fh-idgen", about = "Generate Identifiers")]
enum Commands {
    #[structopt(name = "gen", about = "Generate Identifiers")]
    Generate(Generate),
    #[structopt(name = "hash", about = "Generate via Hashing")]
    Hash(Hash),
    #[structopt(name = "decompose", about = "Decompose Identifiers")]
    Decompose(Decompose),
}

#[derive(Debug, StructOpt)]
struct Generate {
    #[structopt(short = "n", long = "count", default_value = "1")]
    count: usize,
    /// Entity prefix to print, e.g. `order` or `item`
    #[structopt(short = "p", long = "prefix")]
    prefix: Option<String>,
}

#[derive(Debug, StructOpt)]
struct Hash {
    inputs: Vec<String>,
    #[structopt(short = "p", long = "prefix")]
    prefix: Option<String>,
}

#[derive(Debug, StructOpt)]
struct Decompose {
    ids: Vec<UntypedId>,
}

fn show(id: UntypedId, prefix: &Option<String>) {
    match prefix {
        Some(prefix) => println!("{}-{}", prefix, id),
        None => println!("{}", id),
    }
}

fn main() -> Result<()> {
    let cmd = Commands::from_args();

    match cmd {
        Commands::Generate(opt) => {
            let idgen = IdGen::new();
            for _ in 0..opt.count {
                show(idgen.untyped(), &opt.prefix);
            }
        }
        Commands::Hash(opt) => {
            for inp in opt.inputs.iter() {
                let id = UntypedId::hashed(inp.as_bytes());
                show(id, &opt.prefix);
            }
        }

        Commands::Decompose(opt) => {
            for id in opt.ids {
                let stamp: DateTime<Utc> = id.timestamp().into();
                let random = id.random();
                println!(
                    "t:{}; r:0x{:0>16x}",
                    stamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
                    random
                );
            }
        }
    }

    Ok(())
}
