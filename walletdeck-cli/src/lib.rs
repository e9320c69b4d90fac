//! Terminal front end for walletdeck.
//!
//! The `walletdeck` binary runs one-shot commands or the interactive
//! [`Dashboard`].

pub mod dashboard;

pub use dashboard::{Command, Dashboard, FormView, render_form};
