//! Academy Client - one player's game session
//!
//! Joins the shared world, turns held arrow keys into resolved movement,
//! mirrors remote players and coins, and publishes local state back to the
//! store:
//! - Positions through a debounced writer
//! - Coin pickups and teardown writes immediately
//!
//! Also carries the account-side helpers: wallet linking, challenge records
//! and the reward claim client.

pub mod challenges;
pub mod coins;
pub mod config;
pub mod debounce;
pub mod error;
pub mod frame_loop;
pub mod names;
pub mod profile;
pub mod publisher;
pub mod reward;
pub mod session;


pub use coins::CoinPlacer;
pub use config::{PublisherConfig, SessionConfig};
pub use debounce::Debouncer;
pub use error::SessionError;
pub use frame_loop::{EventSender, FrameLoop};
pub use publisher::{ImmediateWrite, PositionUpdate, StatePublisher};
pub use reward::{ChestClaim, RewardClient};
pub use session::{FeedKind, GameSession, SessionEvent, SessionView};
