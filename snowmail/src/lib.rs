//! Snowmail - inbound email moderation and rewrite service.
//!
//! Mail arrives through an authenticated Mailgun webhook, is classified for
//! harmful content, rewritten when flagged, and forwarded to a single reviewer
//! address. Links found in a message can be extracted and saved to Pocket.
//!
//! ## Architecture
//!
//! ```text
//! Mailgun → WebhookGate → Pipeline (moderate → rewrite?) → Forwarder → Mailgun
//!                           │
//!           /email/*  ──────┴── ModerationGateway / RewriteGateway / ThreatGateway
//!                               LinkExtractor → LinkSaver → Pocket
//! ```

pub mod clients;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod links;
pub mod pipeline;
pub mod types;
pub mod web;

// Re-export commonly used types
pub use config::{Config, Features};
pub use dispatch::{Forwarder, OutboundMail};
pub use error::{ClientError, Error, Result, Stage};
pub use pipeline::{Pipeline, RunReport, RunState};
pub use types::{
    InboundMessage, LinkCandidate, ModerationVerdict, ProcessingOutcome, RewriteResult,
    WebhookEvent,
};
pub use web::{router, AppState, Services};
