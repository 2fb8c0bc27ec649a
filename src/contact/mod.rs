//! Contact submission: the `/api/contact` handler and the interactive form
//! that drives it over HTTP.

pub mod client;
pub mod form;
pub mod handler;
pub mod notification;

pub use client::ContactClient;
pub use form::{ContactForm, SubmitOutcome};
pub use handler::{routes, CONTACT_PATH};
