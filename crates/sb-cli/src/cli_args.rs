use clap::{Args, Parser, Subcommand, ValueEnum};
use sb_api::MoveDirection;

#[derive(Debug, Parser)]
#[command(name = "sb-cli")]
#[command(about = "Inspect and edit RPG Maker script containers")]
pub(crate) struct Cli {
    /// Project settings (JSON).
    #[arg(long = "config", global = true)]
    pub(crate) config: Option<String>,
    /// RMXP, RMVX or RMVXAce. Inferred from the container extension when omitted.
    #[arg(long = "engine", global = true)]
    pub(crate) engine: Option<String>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    Tree(FileArgs),
    Show(ShowArgs),
    Check(FileArgs),
    Insert(InsertArgs),
    Remove(RemoveArgs),
    Move(MoveArgs),
    Rename(RenameArgs),
}

#[derive(Debug, Args)]
pub(crate) struct FileArgs {
    /// Script container; falls back to the configured `scriptsPath`.
    #[arg(long = "file")]
    pub(crate) file: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct ShowArgs {
    #[command(flatten)]
    pub(crate) target: FileArgs,
    #[arg(long = "key")]
    pub(crate) key: i32,
}

#[derive(Debug, Args)]
pub(crate) struct InsertArgs {
    #[command(flatten)]
    pub(crate) target: FileArgs,
    /// Parent script; top level when omitted.
    #[arg(long = "parent")]
    pub(crate) parent: Option<i32>,
    /// Position in the parent's list; appended when omitted.
    #[arg(long = "index")]
    pub(crate) index: Option<usize>,
    #[arg(long = "name")]
    pub(crate) name: String,
    #[arg(long = "text")]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct RemoveArgs {
    #[command(flatten)]
    pub(crate) target: FileArgs,
    #[arg(long = "key")]
    pub(crate) key: i32,
    /// Keep the children by moving them up into the removed script's place.
    #[arg(long = "promote")]
    pub(crate) promote: bool,
}

#[derive(Debug, Args)]
pub(crate) struct MoveArgs {
    #[command(flatten)]
    pub(crate) target: FileArgs,
    #[arg(long = "key")]
    pub(crate) key: i32,
    #[arg(long = "direction", value_enum)]
    pub(crate) direction: DirectionArg,
}

#[derive(Debug, Args)]
pub(crate) struct RenameArgs {
    #[command(flatten)]
    pub(crate) target: FileArgs,
    #[arg(long = "key")]
    pub(crate) key: i32,
    #[arg(long = "name")]
    pub(crate) name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DirectionArg {
    Up,
    Down,
    In,
    Out,
}

impl From<DirectionArg> for MoveDirection {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Up => MoveDirection::Up,
            DirectionArg::Down => MoveDirection::Down,
            DirectionArg::In => MoveDirection::In,
            DirectionArg::Out => MoveDirection::Out,
        }
    }
}
