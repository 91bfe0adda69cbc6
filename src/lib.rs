//! Song request desk over a spreadsheet.
//!
//! A catalog sheet holds the set list, a requests sheet collects what people
//! want to hear. [`catalog::CatalogIndex`] loads the set list once,
//! [`requests::RequestLog`] keeps the request list fresh, [`search::search`]
//! filters songs and [`submit::RequestSubmitter`] appends new requests.
//! [`app::App`] wires them to a [`app::PresentationSink`].

pub mod app;
pub mod catalog;
pub mod config;
pub mod date_parser;
pub mod error;
pub mod requests;
pub mod schema;
pub mod search;
pub mod source;
pub mod submit;
pub mod terminal;

pub use error::{Error, Result};
