//! Scoring event bus
//!
//! The lifecycle controller publishes a [`ScoringEvent`] for every stored
//! or deleted scorecard, finalization, failed report, tie and reopen.
//! Subscribers (the server's log sink, tests) receive them over a Tokio
//! broadcast channel.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Controller  │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (publish)   │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

pub mod bus;
pub mod types;

// Re-export core types
pub use bus::{EventBus, MatchReceiver, SharedEventBus};
pub use types::ScoringEvent;
