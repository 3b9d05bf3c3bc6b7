use std::ffi::OsString;

use clap::Parser;
use sb_api::BundleError;

mod cli_args;
mod commands;
mod error_map;
mod project;

pub(crate) use cli_args::{
    Cli, Command, FileArgs, InsertArgs, MoveArgs, RemoveArgs, RenameArgs,
};
pub(crate) use commands::Report;
pub(crate) use error_map::{emit_error, invalid_argument, json_string, round_trip_mismatch};
pub(crate) use project::{
    open_session, resolve_project, save_session, CliSession, Project,
};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
            0
        }
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<Report, BundleError> {
    let Cli {
        config,
        engine,
        command,
    } = cli;
    let project = |target: &FileArgs| {
        resolve_project(target.file.as_deref(), engine.as_deref(), config.as_deref())
    };
    match command {
        Command::Tree(args) => commands::run_tree(&project(&args)?),
        Command::Show(args) => commands::run_show(&project(&args.target)?, args.key),
        Command::Check(args) => commands::run_check(&project(&args)?),
        Command::Insert(args) => commands::run_insert(&project(&args.target)?, &args),
        Command::Remove(args) => commands::run_remove(&project(&args.target)?, &args),
        Command::Move(args) => commands::run_move(&project(&args.target)?, &args),
        Command::Rename(args) => commands::run_rename(&project(&args.target)?, &args),
    }
}
