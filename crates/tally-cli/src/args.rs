//! Command-line parsing.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use num_bigint::BigInt;
use tally_types::Timestamp;

pub const USAGE: &str = "\
usage:
  tally snapshot --block <n> --timestamp <t> [--from-block <n> --from-timestamp <t>] [--out <file>]
  tally check <rewards.json> [--tolerance <n>]
  tally diff <from.json> <to.json> [--out <file>]";

/// A parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Snapshot(SnapshotArgs),
    Check {
        input: PathBuf,
        tolerance: Option<BigInt>,
    },
    Diff {
        from: PathBuf,
        to: PathBuf,
        out: Option<PathBuf>,
    },
    Help,
}

impl Command {
    /// Whether running the command reads the configuration file.
    pub fn needs_config(&self) -> bool {
        matches!(self, Command::Snapshot(_) | Command::Check { .. })
    }
}

/// Where a snapshot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub block: u64,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotArgs {
    pub to: Point,
    /// Start of the window. Without it the snapshot is cumulative.
    pub from: Option<Point>,
    pub out: Option<PathBuf>,
}

/// Parse the arguments after the program name.
pub fn parse(args: &[String]) -> anyhow::Result<Command> {
    let Some((command, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };
    let mut flags = Flags::split(rest)?;

    let parsed = match command.as_str() {
        "snapshot" => {
            let to = Point {
                block: flags.required("--block")?,
                timestamp: flags.required("--timestamp")?,
            };
            let from = match (
                flags.optional::<u64>("--from-block")?,
                flags.optional::<Timestamp>("--from-timestamp")?,
            ) {
                (Some(block), Some(timestamp)) => Some(Point { block, timestamp }),
                (None, None) => None,
                _ => bail!("--from-block and --from-timestamp go together"),
            };
            if let Some(from) = from {
                if from.timestamp > to.timestamp {
                    bail!("--from-timestamp is after --timestamp");
                }
            }
            flags.no_positionals()?;
            Command::Snapshot(SnapshotArgs {
                to,
                from,
                out: flags.optional("--out")?,
            })
        }
        "check" => {
            let tolerance = flags.optional("--tolerance")?;
            let [input] = flags.positionals::<1>()?;
            Command::Check { input, tolerance }
        }
        "diff" => {
            let out = flags.optional("--out")?;
            let [from, to] = flags.positionals::<2>()?;
            Command::Diff { from, to, out }
        }
        "help" | "--help" | "-h" => Command::Help,
        other => bail!("unknown command `{other}`"),
    };

    flags.finish()?;
    Ok(parsed)
}

/// Flag/value pairs and bare positionals, consumed by name.
struct Flags {
    named: Vec<(String, String)>,
    positionals: Vec<String>,
}

impl Flags {
    fn split(args: &[String]) -> anyhow::Result<Self> {
        let mut named = Vec::new();
        let mut positionals = Vec::new();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg.starts_with("--") {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("{arg} needs a value"))?;
                named.push((arg.clone(), value.clone()));
            } else {
                positionals.push(arg.clone());
            }
        }
        Ok(Self { named, positionals })
    }

    fn optional<T>(&mut self, flag: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let Some(index) = self.named.iter().position(|(name, _)| name == flag) else {
            return Ok(None);
        };
        let (_, value) = self.named.remove(index);
        let parsed = value
            .parse()
            .with_context(|| format!("invalid value for {flag}: {value}"))?;
        Ok(Some(parsed))
    }

    fn required<T>(&mut self, flag: &str) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.optional(flag)?
            .ok_or_else(|| anyhow!("missing {flag}"))
    }

    fn positionals<const N: usize>(&mut self) -> anyhow::Result<[PathBuf; N]> {
        let taken: Vec<PathBuf> = self.positionals.drain(..).map(PathBuf::from).collect();
        let found = taken.len();
        taken
            .try_into()
            .map_err(|_| anyhow!("expected {N} file arguments, got {found}"))
    }

    fn no_positionals(&self) -> anyhow::Result<()> {
        match self.positionals.first() {
            Some(extra) => bail!("unexpected argument `{extra}`"),
            None => Ok(()),
        }
    }

    fn finish(&self) -> anyhow::Result<()> {
        if let Some((name, _)) = self.named.first() {
            bail!("unknown flag {name}");
        }
        self.no_positionals()
    }
}
