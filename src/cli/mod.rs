pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "A feed reader that keeps subscriptions in a folder tree", long_about = None)]
pub struct Cli {
    /// Owner whose tree to work on (default: config `owner`, then $USER)
    #[arg(short, long, global = true)]
    pub owner: Option<String>,

    /// Number of feeds synchronized in parallel (default: config `fetch.workers`)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Subscribe to a feed
    Add {
        /// URL of the feed document
        url: String,
        /// Folder to add it to (default: the root folder)
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// Create a folder
    Mkdir {
        title: String,
        /// Parent folder (default: the root folder)
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Rename a folder or feed
    Rename {
        /// Key of the folder or feed, e.g. folder:3
        key: String,
        title: String,
    },
    /// Remove a folder with everything below it, or a single feed
    Remove { key: String },
    /// Fetch new entries for a feed or a whole folder
    Update {
        /// Feed or folder key (default: the root folder)
        key: Option<String>,
    },
    /// Update the trees of every owner
    UpdateAll,
    /// Print the folder tree
    Tree,
    /// List the entries of a feed, newest first
    Entries { feed: String },
    /// Mark entries read, which removes them
    Read {
        /// Feed or folder key
        key: String,
        /// Only this entry of the feed
        #[arg(long, conflicts_with = "link")]
        entry: Option<String>,
        /// Only the entry of the feed with this link
        #[arg(long)]
        link: Option<String>,
    },
    /// Import feeds from an OPML file
    Import {
        /// Path to the OPML file
        path: PathBuf,
        /// Folder to import into (default: the root folder)
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// Background daemon for automatic updates
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Subcommand)]
pub enum DaemonAction {
    /// Start the daemon in the foreground
    Start {
        /// Update interval (e.g., "1h", "30m", "6h", "1d")
        #[arg(short, long)]
        interval: Option<String>,

        /// Skip initial update on start
        #[arg(long)]
        no_initial_update: bool,

        /// Log file path (default: stdout)
        #[arg(short, long)]
        log: Option<PathBuf>,
    },
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
}
