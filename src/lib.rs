//! An unofficial Rust SDK for the Jimeng AI image-generation web API.
//!
//! This SDK drives the service the same way its web client does: it
//! authenticates with a session token, optionally uploads a reference image
//! through the signed object-storage protocol, submits a generation job as a
//! nested "draft" document, and polls until the job reaches a terminal
//! state, returning the resulting image URLs.
//!
//! ## Features
//! - Text-to-image and reference-image ("blend") generation.
//! - SigV4-style request signing for the object-storage endpoint.
//! - Three-phase asset upload (apply, store, commit) with CRC-32 checksums.
//! - Poll-until-terminal with configurable interval, attempt ceiling,
//!   deadline, and cancellation.
//! - Typed error handling distinguishing content filtering, generation
//!   failure, and transport failure.
//!
//! ## Example
//!
//! ```no_run
//! use jimeng::{GenerateOptions, JimengClient};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let client = JimengClient::new(None)?; // reads JIMENG_API_TOKEN
//! let urls = client
//!     .generate("a cute puppy", None, &GenerateOptions::default())
//!     .await?;
//! for url in urls {
//!     println!("{url}");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod draft;
mod error;
mod identity;
mod models;
pub mod poll;
mod signer;
pub mod types;
mod upload;

pub use client::{GenerateOptions, JimengClient};
pub use error::JimengError;
pub use identity::ClientIdentity;
pub use models::{resolve_model, DEFAULT_BLEND_MODEL, DEFAULT_MODEL};
pub use poll::{JobStatus, PollOptions};
pub use types::{CreditInfo, GenerationRecord, HistoryItem, ImageInput};
