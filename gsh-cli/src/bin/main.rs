use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;
use clap::{Parser, Subcommand};

use gsh_cli::{listing, logging};
use gsh_os::config::FilesystemConfig;
use gsh_os::filesystem::Filesystem;
use gsh_os::process;
use gsh_types::PriorityClass;

#[derive(Debug, Parser)]
#[command(name = "gsh", version, about = "Inspect files, directories, and process priorities")]
struct Args {
    /// TOML file to configure the filesystem worker with.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// List the entries of a directory.
    Ls {
        path: String,
        /// Print kind, permissions, size, and modification time.
        #[arg(short, long)]
        long: bool,
        /// Skip entries whose name matches this glob, can be repeated.
        #[arg(long)]
        ignore: Vec<String>,
        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show the attributes of a single entry.
    Stat {
        path: String,
        /// Print attributes as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run a command at the provided priority, exiting with its status.
    Run {
        #[arg(short, long, default_value = "inherit")]
        priority: PriorityClass,
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Change the priority of a running process.
    Renice { pid: u32, priority: PriorityClass },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    logging::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FilesystemConfig::load(path)?,
        None => FilesystemConfig::default(),
    };
    let config = config.with_env_overrides()?;

    match args.command {
        Cmd::Ls {
            path,
            long,
            ignore,
            json,
        } => {
            let ignore = listing::ignore_set(&ignore)?;
            let filesystem = Filesystem::new(&config)?;

            let mut handle = filesystem
                .open(path.clone())
                .diagnostics("gsh ls")
                .as_directory()
                .await
                .with_context(|| format!("opening {path}"))?;
            let entries = handle.entries().await?;
            handle.close().await?;

            let entries = listing::prepare(entries, &ignore);
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    if long {
                        println!("{}", listing::long_line(entry));
                    } else {
                        println!("{}", entry.name());
                    }
                }
            }
        }
        Cmd::Stat { path, json } => {
            let filesystem = Filesystem::new(&config)?;
            let attributes = filesystem.attributes(path.clone()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&attributes)?);
            } else {
                print!("{}", listing::describe(&path, &attributes));
            }
        }
        Cmd::Run { priority, command } => {
            let (program, rest) = command
                .split_first()
                .context("missing command to run")?;
            let mut command = Command::new(program);
            command.args(rest);

            let mut child = process::spawn(&mut command, priority)
                .with_context(|| format!("spawning {program}"))?;
            let status = child.wait()?;
            tracing::debug!(?status, "child exited");
            std::process::exit(status.code().unwrap_or(1));
        }
        Cmd::Renice { pid, priority } => {
            process::set_priority(pid, priority)
                .with_context(|| format!("setting priority of {pid}"))?;
        }
    }

    Ok(())
}
