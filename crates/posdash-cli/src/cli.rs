use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use posdash_core::models::{OrderStatus, SyncCollection};

#[derive(Parser)]
#[command(name = "posdash")]
#[command(about = "Manage guests and point-of-sale orders from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// REST API base URL (overrides POSDASH_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Push channel host (overrides POSDASH_PUSH_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub push_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to a JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage guests
    #[command(subcommand)]
    Guests(GuestCommand),
    /// Manage orders
    #[command(subcommand)]
    Orders(OrderCommand),
    /// Show backend and database health
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Follow a collection live until interrupted
    Watch {
        #[arg(value_enum)]
        target: WatchTarget,
    },
    /// Ask the server to reconcile a collection and follow its progress
    Sync {
        #[arg(value_enum, default_value = "all")]
        collection: SyncTarget,
    },
}

#[derive(Subcommand)]
pub enum GuestCommand {
    /// List all guests
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one guest
    Show { id: String },
    /// Create a guest
    #[command(alias = "new")]
    Add {
        name: String,
        email: String,
        #[command(flatten)]
        contact: ContactArgs,
    },
    /// Update a guest; omitted fields keep their current value
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[command(flatten)]
        contact: ContactArgs,
    },
    /// Delete a guest
    Delete { id: String },
}

#[derive(Args, Default)]
pub struct ContactArgs {
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
}

#[derive(Subcommand)]
pub enum OrderCommand {
    /// List all orders
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one order with its line items
    Show { id: String },
    /// Create an order
    #[command(alias = "new")]
    Add {
        /// Guest ID placing the order
        #[arg(long)]
        guest: String,
        /// Order code; generated when omitted
        #[arg(long)]
        code: Option<String>,
        /// Line item as NAME:QUANTITY:PRICE (repeatable)
        #[arg(long = "item", value_name = "ITEM")]
        items: Vec<String>,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Update an order; line items are replaced when any --item is given
    Edit {
        id: String,
        #[arg(long)]
        guest: Option<String>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long = "item", value_name = "ITEM")]
        items: Vec<String>,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Delete an order
    Delete { id: String },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusArg {
    Pending,
    Completed,
    Cancelled,
}

impl From<StatusArg> for OrderStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pending => Self::Pending,
            StatusArg::Completed => Self::Completed,
            StatusArg::Cancelled => Self::Cancelled,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum WatchTarget {
    Guests,
    Orders,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SyncTarget {
    Guests,
    Orders,
    All,
}

impl From<SyncTarget> for SyncCollection {
    fn from(value: SyncTarget) -> Self {
        match value {
            SyncTarget::Guests => Self::Guests,
            SyncTarget::Orders => Self::Orders,
            SyncTarget::All => Self::All,
        }
    }
}
