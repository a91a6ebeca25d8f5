//! # Bulletin Board Client Library
//!
//! This library provides a client for the bulletin board server. It speaks the
//! line-oriented text protocol over TCP and turns replies back into typed
//! values from the shared library.
//!
//! ## Connection Lifecycle
//!
//! On connect the server sends three handshake lines describing the board
//! size, the fixed note size and the allowed colors. The client validates
//! them before any request is sent; a handshake whose color count does not
//! match the listed colors is rejected.
//!
//! After the handshake every request produces exactly one reply. Replies that
//! carry data start with `OK <N>` and are followed by `N` detail lines, which
//! the client always reads in full so the stream stays in step.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! The connection itself:
//! - Handshake validation
//! - Raw request/reply exchange for interactive use
//! - Typed helpers for every board operation
//! - Server refusals surfaced as `ClientError::Server` with their wire code
//!
//! ### View Module (`view`)
//! A snapshot of the board (configuration, notes and pins) that can be
//! queried locally or printed as JSON.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use shared::NoteFilter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::connect("127.0.0.1:8080").await?;
//!
//!     client.post(10, 10, "red", "buy milk").await?;
//!     client.pin(15, 15).await?;
//!
//!     let red = client.get(NoteFilter::default().with_color("red")).await?;
//!     println!("{} red notes", red.len());
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod view;

pub use network::{Client, ClientError, Reply};
pub use view::BoardView;
