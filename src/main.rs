use crate::{
    config::Args,
    project::{Project, ProjectResult},
};
use clap::Parser;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

mod config;
mod deser;
mod field;
mod proc;
mod procedure_db;
mod project;
mod text_field;
mod workspace;

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = args.validate() {
        eprintln!("Configuration error: {err}");
        return ExitCode::FAILURE;
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("procname={}", args.log_level).into()
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&args) {
        Ok(registry) => {
            println!("{registry}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "giving up");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> ProjectResult<String> {
    let mut project =
        Project::load(&args.project, &args.entry, args.collision_policy())?;
    for rename in &args.renames {
        project.rename(&rename.block, &rename.name)?;
    }
    for block in &args.removals {
        project.remove(block)?;
    }
    project.to_json()
}
