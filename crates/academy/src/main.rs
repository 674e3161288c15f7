//! PixelChain Academy
//!
//! Entry point for both halves of the game:
//! - `serve`: the realtime store (WebSocket) and the reward service (HTTP)
//!   sharing one in-memory store and sign-in registry
//! - `play`: a terminal client that signs in, joins the world and walks it
//! - `challenges`: list (and optionally record) lesson challenges

use academy_client::{challenges, profile, FrameLoop, GameSession, RewardClient};
use academy_world::MapLayout;
use anyhow::{bail, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use realtime_store::{AuthRegistry, MemoryStore, RemoteStore, SharedStore, StoreServer};
use reward_service::{faucet_from_env, ClaimService, DevnetSubmitter, RewardServer};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod terminal;

use config::AcademyConfig;

/// PixelChain Academy world server and terminal client
#[derive(Parser, Debug)]
#[command(name = "academy")]
#[command(about = "Multiplayer pixel-art academy: world server and terminal client", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the realtime store and the reward service
    Serve(ServeArgs),
    /// Join the world from this terminal
    Play(PlayArgs),
    /// List challenge records
    Challenges(ChallengesArgs),
}

#[derive(ClapArgs, Debug)]
struct ServeArgs {
    /// Store WebSocket bind address
    #[arg(long, default_value = "127.0.0.1:8900")]
    ws_addr: String,

    /// Reward HTTP bind address
    #[arg(long, default_value = "127.0.0.1:8899")]
    reward_addr: String,

    /// Solana RPC URL (overrides the config file)
    #[arg(long)]
    rpc_url: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct PlayArgs {
    /// Store WebSocket URL
    #[arg(long, default_value = "ws://127.0.0.1:8900")]
    store_url: String,

    /// Reward service URL
    #[arg(long, default_value = "http://127.0.0.1:8899")]
    reward_url: String,

    /// Collision tile layer (JSON array of tile ids)
    #[arg(long)]
    collisions: Option<PathBuf>,

    /// Wallet address to link before joining
    #[arg(long)]
    wallet: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct ChallengesArgs {
    /// Store WebSocket URL
    #[arg(long, default_value = "ws://127.0.0.1:8900")]
    store_url: String,

    /// Record challenge <ID> before listing
    #[arg(long, value_name = "ID", requires = "uri")]
    add: Option<u64>,

    /// URI of the challenge being recorded
    #[arg(long, requires = "add")]
    uri: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging (stderr, so it stays out of the play screen)
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AcademyConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Serve(serve) => run_serve(serve, config).await,
        Command::Play(play) => run_play(play, config).await,
        Command::Challenges(list) => run_challenges(list).await,
    }
}

/// Run the store server and the reward service until Ctrl+C
async fn run_serve(args: ServeArgs, config: AcademyConfig) -> Result<()> {
    let mut reward = config.reward;
    if let Some(rpc_url) = args.rpc_url {
        reward.rpc_url = rpc_url;
    }

    tracing::info!("Starting PixelChain Academy server");
    tracing::info!("  Store WebSocket: {}", args.ws_addr);
    tracing::info!("  Reward HTTP: {}", args.reward_addr);
    tracing::info!("  Solana RPC: {}", reward.rpc_url);
    tracing::info!("  Reward: {} lamports", reward.reward_lamports);

    let store = MemoryStore::new();
    let auth = AuthRegistry::new();

    let submitter = Arc::new(DevnetSubmitter::new(faucet_from_env()?, &reward)?);
    let claims = Arc::new(ClaimService::new(
        store.clone(),
        auth.clone(),
        submitter,
        reward.reward_lamports,
    ));
    tracing::info!("  Faucet: {}", claims.faucet());

    // Start store WebSocket server
    let ws_addr = args.ws_addr.clone();
    let store_server = tokio::spawn(async move {
        if let Err(e) = StoreServer::new(store, auth).run(&ws_addr).await {
            tracing::error!("Store server error: {}", e);
        }
    });

    // Start reward HTTP server
    let reward_addr = args.reward_addr.clone();
    let reward_server = tokio::spawn(async move {
        if let Err(e) = RewardServer::new(claims).run(&reward_addr).await {
            tracing::error!("Reward server error: {}", e);
        }
    });

    tracing::info!("Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    store_server.abort();
    reward_server.abort();

    Ok(())
}

/// Print every challenge record, one per line
async fn run_challenges(args: ChallengesArgs) -> Result<()> {
    let remote = RemoteStore::connect(&args.store_url).await?;

    if let (Some(id), Some(uri)) = (args.add, args.uri.as_deref()) {
        challenges::add_challenge(&remote, id, uri).await?;
    }
    let records = challenges::list_challenges(&remote).await;
    remote.close();

    for record in records? {
        println!(
            "{}\t{}\t{}",
            record.id,
            record.created_at.to_rfc3339(),
            record.uri
        );
    }
    Ok(())
}

/// Sign in, join the world and hand the terminal to the player
async fn run_play(args: PlayArgs, config: AcademyConfig) -> Result<()> {
    let session_config = config.session;
    let map = match &args.collisions {
        Some(path) => MapLayout::load(path, &session_config.world)?,
        None => {
            tracing::warn!("No collision layer given; the map is open");
            MapLayout::default()
        }
    };

    let remote = Arc::new(RemoteStore::connect(&args.store_url).await?);
    let identity = remote.sign_in_anonymously().await?;
    tracing::info!("Signed in as {}", identity.uid);
    let store: Arc<dyn SharedStore> = remote.clone();

    if let Some(wallet) = &args.wallet {
        profile::link_wallet(&*store, &identity.uid, wallet).await?;
    }
    if !profile::has_wallet(&*store, &identity.uid).await? {
        remote.close();
        bail!("No wallet linked. Run again with --wallet <address>");
    }

    let reward = RewardClient::new(&args.reward_url, &identity.token)?;
    let unlock_after = Duration::from_millis(session_config.chest_unlock_ms);

    let session = GameSession::join(store, &identity.uid, map, session_config).await?;
    let frame_loop = FrameLoop::new(session);
    let events = frame_loop.event_sender();
    let view = frame_loop.subscribe();
    let frame_handle = tokio::spawn(frame_loop.run());

    let result = terminal::run(events, view, reward, unlock_after).await;

    if let Err(e) = frame_handle.await {
        tracing::error!("Frame loop task failed: {}", e);
    }
    remote.close();

    result
}
