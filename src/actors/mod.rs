//! Actor-based broadcast and remediation system
//!
//! Each actor runs as an independent async task communicating via Tokio
//! channels. The hub owns the subscriber set and the sampling timer; the
//! executor owns the remediation queue.
//!
//! ## Architecture Overview
//!
//! ```text
//!               ┌─────────────────┐
//!               │  server (main)  │
//!               └────────┬────────┘
//!                        │ spawns
//!          ┌─────────────┴─────────────┐
//!          │                           │
//!  ┌───────▼────────┐         ┌────────▼────────┐
//!  │  BroadcastHub  │         │ ActionExecutor  │
//!  │  (tick timer)  │         │ (serial queue)  │
//!  └───────┬────────┘         └─────────────────┘
//!          │ probe once per tick
//!  ┌───────▼────────┐
//!  │  MetricsProbe  │
//!  └───────┬────────┘
//!          │ fan-out (per-subscriber mpsc)
//!  ┌───────┴──────────────┐
//!  │ WS client sessions   │
//!  └──────────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: Each actor has an mpsc command channel for control messages
//! 2. **Deliveries**: The hub pushes wire messages into per-subscriber channels
//! 3. **Request/Response**: oneshot channels for synchronous queries

pub mod executor;
pub mod hub;
pub mod messages;
