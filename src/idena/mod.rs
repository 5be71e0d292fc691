//! Idena challenge–response sign-in and authenticated identity queries.

pub mod client;
mod error;
pub mod signin;
pub mod token;

pub use client::{Epoch, HttpIdenaApi, IdenaApi};
pub use error::SessionError;
pub use signin::{AuthOutcome, IdenaSignIn, Proxied, StartOutcome};
