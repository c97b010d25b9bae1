//! # voicetime Core Library
//!
//! This library tracks how long community members spend connected to voice
//! channels and grants roles once their cumulative time crosses
//! operator-configured thresholds. The CLI binary is a thin command layer over
//! the same core library.
//!
//! ## Architecture
//!
//! - **Presence Tracker**: turns join/leave notifications into durable
//!   accumulated time, one transactional record update per notification
//! - **Threshold Evaluator**: decides which roles a fresh total qualifies for
//!   and requests grants from the platform
//! - **Storage**: SQLite-backed voice records and thresholds, TOML-based
//!   configuration
//! - **Platform**: trait for the chat platform's role/message actions, with a
//!   Discord REST implementation
//!
//! ## Key Components
//!
//! - [`PresenceTracker`]: join/leave state machine
//! - [`ThresholdEvaluator`]: role grant decisions
//! - [`SessionQueryService`]: read-only "current total" queries
//! - [`Database`]: voice record and threshold persistence
//! - [`Config`]: application configuration management
//! - [`RoleSink`]: trait for platform role actions

pub mod admin;
pub mod broadcast;
pub mod error;
pub mod events;
pub mod platform;
pub mod presence;
pub mod query;
pub mod storage;
pub mod thresholds;

/// Chat platform member identifier (snowflake).
pub type MemberId = u64;
/// Chat platform role identifier (snowflake).
pub type RoleId = u64;
/// Chat platform channel identifier (snowflake).
pub type ChannelId = u64;
/// Chat platform guild identifier (snowflake).
pub type GuildId = u64;

pub use broadcast::{BroadcastOutcome, Broadcaster};
pub use error::{ConfigError, CoreError, DatabaseError, PlatformError, ValidationError};
pub use events::{Event, Transition, VoiceStateChange};
pub use platform::{DiscordRoleSink, DryRunSink, RoleSink, UnavailableSink};
pub use presence::{PresenceOutcome, PresenceTracker};
pub use query::{SessionQueryService, TimeReport};
pub use storage::{Config, Database, ThresholdRecord, ThresholdStore, TimeStore, VoiceRecord};
pub use thresholds::{Evaluation, NotificationPolicy, ThresholdEvaluator};
