//! `portal`: command-line client for the portal API.
//!
//! Credentials chosen with `--persist local|both` survive between runs in
//! `$CONFIG_DIR/portal-cli/credentials.json`; `--persist session` keeps
//! them for the current process only.

mod persistence;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use portal_sdk::{
    CredentialStore, EntityId, GatewayConfig, MemoryStore, Notification, NotificationFeed,
    PersistMode, Portal, WorkRequest,
};
use tracing_subscriber::EnvFilter;

use crate::persistence::FileStore;

#[derive(Parser, Debug)]
#[command(name = "portal")]
#[command(author, version, about = "Portal API command-line client", long_about = None)]
pub struct Cli {
    /// API base URL (defaults to $PORTAL_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Where to keep the tokens: session, local or both
        #[arg(long, default_value_t = PersistMode::Both)]
        persist: PersistMode,
    },
    /// Forget the stored tokens
    Logout,
    /// Show whether a session is stored
    Status,
    /// In-app notifications
    #[command(subcommand)]
    Notifications(NotificationCommands),
    /// Work requests
    #[command(subcommand)]
    Requests(RequestCommands),
    /// Show the signed-in employee's profile
    Profile,
    /// Company admin credentials
    #[command(subcommand)]
    Credentials(CredentialCommands),
}

#[derive(Subcommand, Debug)]
pub enum NotificationCommands {
    /// List notifications
    List,
    /// Mark one notification as read
    Read(IdArg),
    /// Mark every notification as read
    ReadAll,
    /// Poll and print the unread counter until interrupted
    Watch,
}

#[derive(Subcommand, Debug)]
pub enum RequestCommands {
    /// Requests assigned to me
    Assigned,
    /// One request with its history
    Show(IdArg),
}

#[derive(Subcommand, Debug)]
pub enum CredentialCommands {
    /// List credentials
    List,
    /// Delete a credential
    Delete(IdArg),
}

#[derive(Args, Debug)]
pub struct IdArg {
    /// Entity id
    pub id: EntityId,
}

fn open_portal(api_url: Option<String>) -> Portal {
    let mut config = GatewayConfig::from_env();
    if let Some(url) = api_url {
        config = config.with_base_url(url);
    }

    let durable: Arc<dyn portal_sdk::KeyValueStore> = match persistence::default_path() {
        Some(path) => Arc::new(FileStore::open(path)),
        None => {
            tracing::warn!("no config directory, credentials will not be kept");
            Arc::new(MemoryStore::new())
        }
    };
    let credentials = CredentialStore::new(Arc::new(MemoryStore::new()), durable);
    Portal::new(config, credentials)
}

fn require_session(portal: &Portal) -> Result<()> {
    if !portal.session.is_authenticated() {
        bail!("not signed in, run `portal login` first");
    }
    Ok(())
}

fn print_notification(n: &Notification) {
    let marker = if n.read { ' ' } else { '*' };
    let when = n
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    println!("{marker} [{}] {when} {}: {}", n.id, n.title, n.message);
}

fn print_feed(feed: &NotificationFeed) {
    for n in &feed.items {
        print_notification(n);
    }
    println!("{} unread", feed.unread);
}

fn print_request(r: &WorkRequest) {
    println!(
        "[{}] {:<10} {} ({})",
        r.id,
        r.status,
        r.title,
        r.requester_name.as_deref().unwrap_or("-")
    );
}

async fn run(cli: Cli) -> Result<()> {
    let portal = open_portal(cli.api_url);

    match cli.command {
        Commands::Login {
            email,
            password,
            persist,
        } => {
            let user = portal
                .session
                .login(&email, &password, persist)
                .await
                .context("login failed")?;
            match user {
                Some(user) => println!(
                    "Signed in as {} ({})",
                    user.name.as_deref().unwrap_or(&user.email),
                    user.role
                ),
                None => println!("Signed in as {email}"),
            }
            if persist == PersistMode::Session {
                println!("Session-only tokens are dropped when this command exits.");
            }
        }
        Commands::Logout => {
            portal.logout();
            println!("Signed out");
        }
        Commands::Status => {
            if portal.session.is_authenticated() {
                println!("Signed in");
            } else {
                println!("Signed out");
            }
        }
        Commands::Notifications(command) => {
            require_session(&portal)?;
            let center = &portal.notifications;
            match command {
                NotificationCommands::List => print_feed(&center.refresh(true).await?),
                NotificationCommands::Read(IdArg { id }) => {
                    center.refresh(false).await?;
                    if !center.mark_read(&id).await {
                        bail!("could not mark notification {id} as read");
                    }
                    println!("{} unread", center.unread());
                }
                NotificationCommands::ReadAll => {
                    center.refresh(false).await?;
                    if !center.mark_all_read().await {
                        bail!("could not mark notifications as read");
                    }
                    println!("0 unread");
                }
                NotificationCommands::Watch => {
                    let _poller = center.start();
                    let mut ticker = tokio::time::interval(portal.client.config().poll_period);
                    loop {
                        tokio::select! {
                            _ = ticker.tick() => {
                                let entry = center.snapshot();
                                match (entry.data, entry.error) {
                                    (_, Some(error)) => eprintln!("poll failed: {error}"),
                                    (Some(feed), None) => println!("{} unread", feed.unread),
                                    (None, None) => {}
                                }
                                if !portal.session.is_authenticated() {
                                    bail!("session expired");
                                }
                            }
                            _ = tokio::signal::ctrl_c() => break,
                        }
                    }
                }
            }
        }
        Commands::Requests(command) => {
            require_session(&portal)?;
            match command {
                RequestCommands::Assigned => {
                    for request in portal.assigned_requests.refresh(false).await? {
                        print_request(&request);
                    }
                }
                RequestCommands::Show(IdArg { id }) => {
                    let details = portal.request_details.refresh(id, false).await?;
                    print_request(&details.summary);
                    if let Some(description) = &details.description {
                        println!("\n{description}\n");
                    }
                    for event in &details.history {
                        println!(
                            "  {} {} {}",
                            event.at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                            event.status,
                            event.note.as_deref().unwrap_or("")
                        );
                    }
                    for attachment in &details.attachments {
                        println!("  attachment: {}", attachment.file_name);
                    }
                }
            }
        }
        Commands::Profile => {
            require_session(&portal)?;
            let profile = portal.profile.refresh(false).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Credentials(command) => {
            require_session(&portal)?;
            match command {
                CredentialCommands::List => {
                    for credential in portal.admin_credentials.refresh(false).await? {
                        println!(
                            "[{}] {} {}",
                            credential.id,
                            credential.name,
                            credential.kind.as_deref().unwrap_or("")
                        );
                    }
                }
                CredentialCommands::Delete(IdArg { id }) => {
                    portal.admin_credentials.delete(&id).await?;
                    println!("Deleted credential {id}");
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn login_defaults_to_both_scopes() {
        let cli = Cli::try_parse_from([
            "portal", "login", "--email", "ana@example.com", "--password", "secret",
        ])
        .unwrap();
        match cli.command {
            Commands::Login { persist, .. } => assert_eq!(persist, PersistMode::Both),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn global_api_url_after_subcommand() {
        let cli = Cli::try_parse_from([
            "portal",
            "requests",
            "show",
            "12",
            "--api-url",
            "http://localhost:4100",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:4100"));
        assert!(matches!(
            cli.command,
            Commands::Requests(RequestCommands::Show(IdArg { ref id })) if id.as_str() == "12"
        ));
    }
}
