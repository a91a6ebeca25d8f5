//! # Bulletin Board Server Library
//!
//! This library provides the authoritative server for a shared virtual
//! bulletin board. Clients post fixed-size colored notes on a bounded board,
//! query them with filters, pin points to hold notes down, and shake the board
//! to discard whatever is not pinned.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Board
//! The server owns the only copy of the board. Every rule (allowed colors,
//! board bounds, no two notes on an identical rectangle) is enforced here, and
//! a refused operation leaves the board exactly as it was.
//!
//! ### Protocol Dispatch
//! Each text line from a client is parsed into a closed request type, executed
//! against the board, and answered with exactly one logical response. A
//! multi-line response starts with `OK <N>` announcing its detail lines.
//!
//! ### Connection Handling
//! Every accepted socket gets its own task which sends the three-line
//! handshake and then loops read, dispatch, write until the client sends
//! `DISCONNECT` or the socket fails. One failing connection never affects the
//! others or the listener.
//!
//! ## Architecture Design
//!
//! ### Single Coarse Lock
//! The board state sits behind one async mutex. Each operation, including the
//! multi-step ones (post then attach to existing pins, pin then link every
//! covered note, shake then drop orphaned pins), runs inside a single lock
//! acquisition, giving linearizable behavior. Socket I/O happens outside the
//! lock so slow peers never hold it.
//!
//! ### Arena Instead of Object Graph
//! Notes and pins reference each other many-to-many. They live in maps keyed
//! by integer ids: a pin keeps the set of note ids it holds down, a note keeps
//! the number of pins linked to it. Both sides are updated together.
//!
//! ## Module Organization
//!
//! ### Entity Module (`entity`)
//! Note and pin records, the point-in-rectangle test, and filter matching.
//!
//! ### Board Module (`board`)
//! Configuration, domain errors, the lock-protected state machine and its
//! invariant audit.
//!
//! ### Dispatcher Module (`dispatcher`)
//! Stateless translation from request lines to board calls and back.
//!
//! ### Client Manager Module (`client_manager`)
//! Registry of live connections used for logging and monitoring.
//!
//! ### Network Module (`network`)
//! TCP listener, per-connection session loop and its lifecycle states.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::board::{Board, BoardConfig};
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BoardConfig::new((200, 100), (20, 10), ["red", "blue"])?;
//!     let server = Server::bind("127.0.0.1:8080", Board::new(config)).await?;
//!
//!     // Accepts connections forever, one task per client
//!     server.run().await;
//!
//!     Ok(())
//! }
//! ```

pub mod board;
pub mod client_manager;
pub mod dispatcher;
pub mod entity;
pub mod network;
