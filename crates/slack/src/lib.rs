//! Slack Integration - Socket Mode bot interface
//!
//! This crate provides the Slack surface of orderdesk:
//! - **Socket Mode** (`socket`) - event loop over a pluggable transport with reconnection
//! - **Slash Commands** (`commands`) - `/pedido email`, `/pedido usuario`, `/pedido verificar`, ...
//! - **Events** (`events`) - slash commands, block actions and modal submissions
//! - **Block Kit** (`blocks`) - order cards, candidate selects, the lookup panel and modal
//!
//! # Architecture
//!
//! ```text
//! Slack Events → EventDispatcher → Handlers → WorkflowController → Order API
//!                    ↓
//!              Block Kit UI ← WorkflowReport
//! ```
//!
//! # Key Types
//!
//! - `SocketModeRunner` - event loop with reconnection logic
//! - `EventDispatcher` - routes events to the lookup handlers
//! - `MessageBuilder` - constructs rich Slack messages
//! - `CommandRouter` - maps `/pedido` verbs onto workflow runs

pub mod blocks;
pub mod commands;
pub mod events;
pub mod socket;
