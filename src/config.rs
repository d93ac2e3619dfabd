use crate::{proc::BlockId, procedure_db::CollisionPolicy};
use clap::Parser;
use std::path::PathBuf;

/// Replays procedure renames against a block workspace and prints the
/// resulting procedure registry.
#[derive(Debug, Parser)]
#[command(name = "procname", version, about)]
pub(crate) struct Args {
    /// Project file: a JSON block map, or a zip archive (.zip, .aia, .sb3)
    /// containing one
    pub project: PathBuf,

    /// Commit NAME to the name field of definition block BLOCK; repeatable,
    /// applied in order
    #[arg(
        long = "rename",
        value_name = "BLOCK=NAME",
        value_parser = parse_rename
    )]
    pub renames: Vec<Rename>,

    /// Delete definition block BLOCK and its call blocks after all renames;
    /// repeatable
    #[arg(
        long = "remove",
        value_name = "BLOCK",
        value_parser = parse_block_id
    )]
    pub removals: Vec<BlockId>,

    /// Let several definitions share a procedure name
    #[arg(long)]
    pub allow_duplicates: bool,

    /// Archive entry holding the block map
    #[arg(long, env = "PROCNAME_ENTRY", default_value = "project.json")]
    pub entry: String,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "PROCNAME_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rename {
    pub block: BlockId,
    pub name: String,
}

fn parse_block_id(s: &str) -> Result<BlockId, String> {
    if s.is_empty() {
        Err("block ID cannot be empty".to_owned())
    } else {
        Ok(BlockId::new(s))
    }
}

fn parse_rename(s: &str) -> Result<Rename, String> {
    match s.split_once('=') {
        Some((block, name)) if !block.is_empty() => Ok(Rename {
            block: BlockId::new(block),
            name: name.to_owned(),
        }),
        _ => Err(format!("expected BLOCK=NAME, got `{s}`")),
    }
}

impl Args {
    pub fn collision_policy(&self) -> CollisionPolicy {
        if self.allow_duplicates {
            CollisionPolicy::Allow
        } else {
            CollisionPolicy::Reject
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.entry.is_empty() {
            return Err("--entry cannot be empty".to_owned());
        }
        self.log_level
            .parse::<tracing::Level>()
            .map_err(|_| format!("unknown log level `{}`", self.log_level))?;
        Ok(())
    }
}
