//! CLI interface for Ordermatrix
//!
//! Provides command-line access to:
//! - Encoding an entity plus attributes into a key
//! - Decoding a key back into attribute names
//! - Searching a cart snapshot
//! - Listing parents that may take a given child under a rule set

use crate::builder::MatrixEntityBuilder;
use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::dimensional::Aid;
use crate::matrix::{decode_key, Key, KeyMode, Pid};
use crate::ops;
use crate::tensor::{ChildValidityTensor, RuleConfig};
use anyhow::{anyhow, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ordermatrix")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Attribute-matrix keys and cart queries for configurable menu items")]
#[command(
    long_about = "Ordermatrix - key codec and cart engine for configurable menu items\n\n\
    A generic entity (e.g. a cone) varies along dimensions (size, flavor). Choosing one\n\
    attribute per dimension gives a specific entity with a canonical key such as 1:0:1.\n\n\
    Examples:\n\
      ordermatrix key -c menu.json --pid cone --attr small --attr chocolate\n\
      ordermatrix decode -c menu.json --key 1:0:1\n\
      ordermatrix find --cart cart.json --pattern '1:*:1'\n\
      ordermatrix parents --cart cart.json --rules rules.json --child 9"
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode an entity and attributes into a key
    #[command(
        long_about = "Encode an entity and attributes into a key\n\n\
        Entities and attributes may be given by catalog name or numeric id. When two\n\
        attributes share a dimension the first one wins. Attributes the entity does\n\
        not use are listed after the key.\n\n\
        Example:\n\
          ordermatrix key -c menu.json --pid cone --attr small --attr chocolate\n\
          ordermatrix key -c menu.json --pid 1 --attr 10 --pattern"
    )]
    Key {
        /// Catalog JSON file
        #[arg(short, long, value_name = "FILE")]
        catalog: PathBuf,

        /// Entity name or id
        #[arg(short, long, value_name = "PID")]
        pid: String,

        /// Attribute name or id (repeatable)
        #[arg(short, long = "attr", value_name = "AID")]
        attrs: Vec<String>,

        /// Leave unassigned dimensions as wildcards
        #[arg(long)]
        pattern: bool,
    },

    /// Decode a key into its entity and attributes
    Decode {
        /// Catalog JSON file
        #[arg(short, long, value_name = "FILE")]
        catalog: PathBuf,

        /// Key to decode, e.g. 1:0:1
        #[arg(short, long, value_name = "KEY")]
        key: String,
    },

    /// Search a cart snapshot
    #[command(group(
        ArgGroup::new("query")
            .required(true)
            .args(["key", "pattern", "pid", "child_key", "child_pid"])
    ))]
    Find {
        /// Cart snapshot JSON file
        #[arg(long, value_name = "FILE")]
        cart: PathBuf,

        /// Exact key
        #[arg(long, value_name = "KEY")]
        key: Option<String>,

        /// Key with '*' wildcard segments
        #[arg(long, value_name = "KEY")]
        pattern: Option<String>,

        /// Entity id
        #[arg(long, value_name = "PID")]
        pid: Option<u32>,

        /// Exact key of a direct child
        #[arg(long, value_name = "KEY")]
        child_key: Option<String>,

        /// Entity id of a direct child
        #[arg(long, value_name = "PID")]
        child_pid: Option<u32>,
    },

    /// List top-level items that may take a child
    Parents {
        /// Cart snapshot JSON file
        #[arg(long, value_name = "FILE")]
        cart: PathBuf,

        /// Rule set JSON file
        #[arg(long, value_name = "FILE")]
        rules: PathBuf,

        /// Key of the candidate child
        #[arg(long, value_name = "KEY")]
        child: String,
    },
}

/// Install the stderr subscriber; a second call is a no-op.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let stdout = io::stdout();
    execute(cli, &mut stdout.lock())
}

fn resolve_pid(catalog: &Catalog, raw: &str) -> Result<Pid> {
    if let Some(pid) = catalog.pid_by_name(raw) {
        return Ok(pid);
    }
    raw.parse()
        .map(Pid)
        .map_err(|_| anyhow!("unknown entity '{raw}'"))
}

fn resolve_aid(catalog: &Catalog, raw: &str) -> Result<Aid> {
    if let Some(aid) = catalog.aid_by_name(raw) {
        return Ok(aid);
    }
    raw.parse()
        .map(Aid)
        .map_err(|_| anyhow!("unknown attribute '{raw}'"))
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    Catalog::load(path).with_context(|| format!("loading catalog {}", path.display()))
}

fn load_cart(path: &Path) -> Result<Cart> {
    Cart::load(path).with_context(|| format!("loading cart {}", path.display()))
}

/// Run a parsed command, writing results to `out`
pub fn execute<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    match cli.command {
        Commands::Key {
            catalog,
            pid,
            attrs,
            pattern,
        } => {
            let catalog = load_catalog(&catalog)?;
            let pid = resolve_pid(&catalog, &pid)?;

            let mut builder = MatrixEntityBuilder::with_pid(&catalog, pid);
            for raw in &attrs {
                let aid = resolve_aid(&catalog, raw)?;
                if !builder.add_attribute(aid)? {
                    writeln!(out, "skipped: {raw} (dimension already chosen)")?;
                }
            }

            let mode = if pattern { KeyMode::Pattern } else { KeyMode::Exact };
            let key = builder.get_key(mode)?;
            writeln!(out, "{key}")?;
            for aid in builder.get_unused_attributes() {
                let name = catalog.attribute_name(aid).unwrap_or("?");
                writeln!(out, "unused: {name} ({aid})")?;
            }
            Ok(())
        }

        Commands::Decode { catalog, key } => {
            let catalog = load_catalog(&catalog)?;
            let decoded = decode_key(&Key::new(key), &catalog)?;

            let entity = catalog.entity_name(decoded.pid).unwrap_or("?");
            writeln!(out, "entity: {entity} ({})", decoded.pid)?;
            for (dim, aid) in &decoded.attributes {
                let dim_name = catalog.dimension_name(*dim).unwrap_or("?");
                match aid {
                    Some(aid) => {
                        let name = catalog.attribute_name(*aid).unwrap_or("?");
                        writeln!(out, "  {dim_name}: {name} ({aid})")?;
                    }
                    None => writeln!(out, "  {dim_name}: *")?,
                }
            }
            Ok(())
        }

        Commands::Find {
            cart,
            key,
            pattern,
            pid,
            child_key,
            child_pid,
        } => {
            let cart = load_cart(&cart)?;

            let hits: Vec<_> = if let Some(key) = key {
                ops::find_by_key(&cart, &Key::new(key)).cloned().collect()
            } else if let Some(pattern) = pattern {
                ops::find_by_key_regex(&cart, &Key::new(pattern))?
                    .cloned()
                    .collect()
            } else if let Some(pid) = pid {
                ops::find_by_pid(&cart, Pid(pid)).cloned().collect()
            } else if let Some(child_key) = child_key {
                ops::find_by_child_key(&cart, &Key::new(child_key))
                    .cloned()
                    .collect()
            } else if let Some(child_pid) = child_pid {
                ops::find_by_child_pid(&cart, Pid(child_pid)).cloned().collect()
            } else {
                return Err(anyhow!("no search criterion given"));
            };

            for item in &hits {
                writeln!(out, "{}\t{}\tx{}", item.uid, item.key, item.quantity)?;
            }
            if hits.is_empty() {
                writeln!(out, "no matches")?;
            }
            Ok(())
        }

        Commands::Parents { cart, rules, child } => {
            let cart = load_cart(&cart)?;
            let rules = RuleConfig::load(&rules)
                .with_context(|| format!("loading rules {}", rules.display()))?;
            let tensor = ChildValidityTensor::from_config(&rules);
            let child = Key::new(child);

            let mut count = 0usize;
            for item in ops::find_compatible_parent(&cart, &tensor, &child) {
                writeln!(out, "{}\t{}", item.uid, item.key)?;
                count += 1;
            }
            if count == 0 {
                writeln!(out, "no compatible parents")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_requires_a_criterion() {
        let err = Cli::try_parse_from(["ordermatrix", "find", "--cart", "c.json"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn find_rejects_two_criteria() {
        let err = Cli::try_parse_from([
            "ordermatrix",
            "find",
            "--cart",
            "c.json",
            "--pid",
            "1",
            "--key",
            "1:0",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn key_collects_repeated_attrs() {
        let cli = Cli::try_parse_from([
            "ordermatrix", "-v", "key", "-c", "m.json", "--pid", "cone", "--attr", "small", "--attr",
            "chocolate",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Key { attrs, pattern, .. } => {
                assert_eq!(attrs, vec!["small", "chocolate"]);
                assert!(!pattern);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn resolve_by_name_or_number() {
        let catalog = Catalog::from_json_str(
            r#"{"dimensions": [{"id": 0, "name": "size", "attributes": [{"aid": 10, "name": "small"}]}],
                "entities": [{"pid": 1, "name": "cone", "dimensions": [0]}]}"#,
        )
        .unwrap();
        assert_eq!(resolve_pid(&catalog, "cone").unwrap(), Pid(1));
        assert_eq!(resolve_pid(&catalog, "5").unwrap(), Pid(5));
        assert!(resolve_pid(&catalog, "waffle").is_err());
        assert_eq!(resolve_aid(&catalog, "small").unwrap(), Aid(10));
        assert_eq!(resolve_aid(&catalog, "11").unwrap(), Aid(11));
        assert!(resolve_aid(&catalog, "huge").is_err());
    }
}
