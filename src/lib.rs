//! Convore Rust Client
//!
//! A Rust client library for the Convore group-chat API: authenticated
//! account, group, topic and message calls, plus a live activity stream
//! built from chained long polls that resume from the last message seen.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use convore::{Client, LiveEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new("alice", "s3cret");
//!
//!     // Plain API call
//!     let groups = client.groups().list().await?.into_result()?;
//!     println!("groups: {}", groups);
//!
//!     // Follow live activity until cancelled
//!     let mut live = client.live().build();
//!     live.run(|event| match event {
//!         LiveEvent::Message(message) => println!("{:?}: {}", message.kind(), message.body()),
//!         LiveEvent::Unauthorized(err) => eprintln!("rejected: {}", err),
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

mod api;
mod client;
mod error;
mod live;
mod transport;
mod types;

pub use api::{AccountApi, CreateGroup, GroupKind, GroupsApi, MessagesApi, TopicsApi};
pub use client::{Client, ClientBuilder, DEFAULT_BASE_URL, DEFAULT_MAX_REDIRECTS};
pub use error::{Error, InvalidHeaderError, ParameterError};
pub use live::{
    advance_cursor, LiveBatch, LiveBuilder, LiveEnd, LiveEvent, LiveMessage, LiveStream, LIVE_PATH,
};
pub use transport::{Method, RequestSpec, ResponseOutcome, Target};
pub use types::{ApiError, Credentials, Cursor, Reply};

/// Re-exported so callers can build tokens for [`LiveBuilder::cancellation`].
pub use tokio_util::sync::CancellationToken;
