//! Kainet client: an encrypted room chat over a shared `messages` table.
//!
//! The [`session::Session`] owns the derived key and the poll cursor and talks
//! to any [`store::MessageStore`]. [`driver::Driver`] wires a session to an input
//! stream, a poll timer and a [`render::Renderer`].

pub mod commands;
pub mod driver;
pub mod error;
pub mod hrana;
pub mod remote;
pub mod render;
pub mod session;
pub mod store;

pub use driver::Driver;
pub use error::{ClientError, StoreError};
pub use remote::RemoteStore;
pub use session::{Body, Delivered, Session};
pub use store::{LocalStore, MessageStore};
