use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{
    AlwaysSave, ClientResult, ClientSettings, ConversationBackend, ConversationSession,
    GuardOutcome, HttpBackend, LocalBackend, SessionSnapshot,
};
use shared::domain::FileIdentifier;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chat-curator", about = "Browse and curate conversation files")]
struct Cli {
    /// Workspace server to talk to. Falls back to CHAT_CURATOR_SERVER_URL.
    #[arg(long, conflicts_with = "workspace")]
    server_url: Option<String>,
    /// Work on a local workspace directory instead of a server.
    #[arg(long)]
    workspace: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every directory with its file count.
    Dirs,
    /// List the files of a directory in display order.
    Files { directory: String },
    /// Print one conversation.
    Show {
        directory: String,
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Create an empty conversation after the file at `--after`.
    New {
        directory: String,
        #[arg(long)]
        after: Option<usize>,
    },
    Delete {
        directory: String,
        #[arg(long)]
        index: usize,
    },
    /// Rename every file to 1.json, 2.json, ... in display order.
    Renumber { directory: String },
    /// Move a message within a conversation and save it.
    Move {
        directory: String,
        #[arg(long)]
        index: usize,
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },
    /// Move one conversation into another directory.
    Export {
        directory: String,
        #[arg(long)]
        index: usize,
        #[arg(long)]
        to: String,
    },
    Mkdir { path: String },
    Rmdir { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
    let cli = Cli::parse();

    let settings = ClientSettings::from_env()?;
    let backend: Arc<dyn ConversationBackend> = match (&cli.workspace, &cli.server_url) {
        (Some(root), _) => Arc::new(LocalBackend::open(root).await?),
        (None, Some(url)) => Arc::new(HttpBackend::new(url)?),
        (None, None) => {
            settings.validate()?;
            Arc::new(HttpBackend::new(&settings.server_url)?)
        }
    };
    let session =
        ConversationSession::new_with_notice_ttl(backend, Arc::new(AlwaysSave), settings.notice_ttl);

    match cli.command {
        Command::Dirs => {
            for directory in session.list_directories().await? {
                println!("{}", directory.label());
            }
        }
        Command::Files { directory } => {
            session.select_directory(&directory).await?;
            print_files(&session.snapshot().await);
        }
        Command::Show { directory, index } => {
            open_at(&session, &directory, index).await?;
            print_conversation(&session.snapshot().await);
        }
        Command::New { directory, after } => {
            match after {
                Some(index) => open_at(&session, &directory, index).await?,
                None => {
                    session.select_directory(&directory).await?;
                }
            }
            session.new_conversation().await?;
            let snapshot = session.snapshot().await;
            if let Some(path) = &snapshot.current_path {
                println!("created {path}");
            }
            print_files(&snapshot);
        }
        Command::Delete { directory, index } => {
            open_at(&session, &directory, index).await?;
            let removed = session.snapshot().await.current_path;
            session.delete_current().await?;
            if let Some(path) = removed {
                println!("deleted {path}");
            }
            print_files(&session.snapshot().await);
        }
        Command::Renumber { directory } => {
            session.select_directory(&directory).await?;
            session.renumber().await?;
            print_files(&session.snapshot().await);
        }
        Command::Move {
            directory,
            index,
            from,
            to,
        } => {
            open_at(&session, &directory, index).await?;
            if session.apply_reorder(from, to).await? {
                session.save().await?;
            }
            print_conversation(&session.snapshot().await);
        }
        Command::Export {
            directory,
            index,
            to,
        } => {
            open_at(&session, &directory, index).await?;
            let moved = session.snapshot().await.current_path;
            session.export_current(&to).await?;
            if let Some(path) = moved {
                println!("exported {path} to {to}");
            }
            print_files(&session.snapshot().await);
        }
        Command::Mkdir { path } => {
            session.create_directory(&path).await?;
            println!("created directory {path}");
        }
        Command::Rmdir { path } => {
            session.delete_directory(&path).await?;
            println!("deleted directory {path}");
        }
    }

    Ok(())
}

/// Selects `directory` and steps forward to file `index`.
async fn open_at(session: &ConversationSession, directory: &str, index: usize) -> Result<()> {
    let selected = session.select_directory(directory).await;
    step_over_unreadable(session, selected).await?;
    let total = session.snapshot().await.total;
    if index >= total {
        bail!("index {index} is out of range; '{directory}' has {total} files");
    }
    for _ in 0..index {
        let stepped = session.next().await;
        step_over_unreadable(session, stepped).await?;
    }
    debug!(directory, index, "conversation opened");
    Ok(())
}

/// A step that landed on a file which failed to load still counts, so
/// `show` and `delete` can reach files past it.
async fn step_over_unreadable(
    session: &ConversationSession,
    result: ClientResult<GuardOutcome>,
) -> Result<()> {
    match result {
        Err(err) if session.snapshot().await.load_failed => {
            warn!(error = %err, "skipping unreadable conversation");
            Ok(())
        }
        other => other.map(|_| ()).map_err(Into::into),
    }
}

fn print_files(snapshot: &SessionSnapshot) {
    if snapshot.files.is_empty() {
        println!("(no files)");
        return;
    }
    for (index, file) in snapshot.files.iter().enumerate() {
        let marker = if snapshot.cursor == Some(index) { '>' } else { ' ' };
        println!("{marker} {index:>3}  {:<12} {file}", file.display_name());
    }
}

fn print_conversation(snapshot: &SessionSnapshot) {
    let Some(path) = &snapshot.current_path else {
        println!("(no conversation)");
        return;
    };
    let position = snapshot.cursor.map_or(0, |cursor| cursor + 1);
    println!("{} [{position}/{}]", title(path), snapshot.total);
    if snapshot.load_failed {
        println!("  (could not be read)");
        return;
    }
    for (index, entry) in snapshot.messages.iter().enumerate() {
        let marker = if snapshot.selection == Some(entry.handle) { '*' } else { ' ' };
        println!("{marker} {index:>2} [{}]", entry.message.role);
        for line in entry.message.content.lines() {
            println!("      {line}");
        }
    }
}

fn title(path: &FileIdentifier) -> String {
    format!("{} ({path})", path.display_name())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
