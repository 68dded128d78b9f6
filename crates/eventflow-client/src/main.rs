use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use eventflow_client::cli::{contacts, send, tickets, watch, CliConfig};

#[derive(Parser)]
#[command(name = "eventflow")]
#[command(about = "EventFlow messaging from the terminal")]
struct Cli {
    /// Path to JSON config file (contains apiBase, gatewayUrl, userId)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the unread badge and live events until interrupted
    Watch,

    /// Send a message; without text the saved draft is resumed
    Send {
        /// Conversation ID
        conversation_id: String,
        /// Message text
        #[arg(long, short = 'm')]
        message: Option<String>,
        /// File to attach (can be specified multiple times)
        #[arg(long, short = 'f')]
        file: Vec<PathBuf>,
    },

    /// List saved drafts, newest first
    Drafts,

    /// Contact directory
    #[command(subcommand)]
    Contacts(ContactsCommand),

    /// Support ticket desk
    #[command(subcommand)]
    Tickets(TicketsCommand),
}

#[derive(Subcommand)]
enum ContactsCommand {
    /// Search contacts; an empty query lists everyone
    Search {
        #[arg(default_value = "")]
        query: String,
    },

    /// Resolve a contact to a direct conversation, creating one if none exists
    Resolve {
        /// Contact user ID or email address
        contact: String,
    },
}

#[derive(Subcommand)]
enum TicketsCommand {
    /// List tickets, urgent first
    List {
        /// Free-text match against subject, sender and excerpt
        #[arg(long, short = 'q')]
        query: Option<String>,
        /// open, in_progress, resolved or closed
        #[arg(long, short = 's')]
        status: Option<String>,
        /// low, medium, high or urgent
        #[arg(long, short = 'p')]
        priority: Option<String>,
        /// Only unassigned tickets
        #[arg(long, conflicts_with = "assigned")]
        unassigned: bool,
        /// Only assigned tickets
        #[arg(long)]
        assigned: bool,
    },

    /// Reply to the customer in the ticket's thread
    Reply {
        ticket_id: String,
        message: String,
    },

    /// Move a ticket to a new status
    Status {
        ticket_id: String,
        status: String,
    },

    /// Change a ticket's priority
    Priority {
        ticket_id: String,
        priority: String,
    },

    /// Assign a ticket to an admin, or unassign it when no admin is given
    Assign {
        ticket_id: String,
        /// Admin user ID
        admin_id: Option<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<CliConfig> {
    if let Some(path) = path {
        return CliConfig::load(path);
    }
    let default = CliConfig::default_path();
    if default.exists() {
        CliConfig::load(&default)
    } else {
        Ok(CliConfig::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventflow_core=info,eventflow_client=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?.into_core()?;

    match cli.command {
        Commands::Watch => watch::run(config).await,
        Commands::Send {
            conversation_id,
            message,
            file,
        } => send::run(config, conversation_id, message, file).await,
        Commands::Drafts => send::list_drafts(config),
        Commands::Contacts(command) => match command {
            ContactsCommand::Search { query } => contacts::search(config, query).await,
            ContactsCommand::Resolve { contact } => contacts::resolve(config, contact).await,
        },
        Commands::Tickets(command) => match command {
            TicketsCommand::List {
                query,
                status,
                priority,
                unassigned,
                assigned,
            } => tickets::list(config, query, status, priority, unassigned, assigned).await,
            TicketsCommand::Reply { ticket_id, message } => {
                tickets::reply(config, ticket_id, message).await
            }
            TicketsCommand::Status { ticket_id, status } => {
                tickets::set_status(config, ticket_id, status).await
            }
            TicketsCommand::Priority {
                ticket_id,
                priority,
            } => tickets::set_priority(config, ticket_id, priority).await,
            TicketsCommand::Assign {
                ticket_id,
                admin_id,
            } => tickets::assign(config, ticket_id, admin_id).await,
        },
    }
}
