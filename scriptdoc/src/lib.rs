//! scriptdoc - structured documents for creative writing
//!
//! Screenplays, stage plays, audio dramas, comic scripts and novels are
//! held as typed paragraphs in a [`model::Document`], styled by a
//! [`template::Template`], kept normalised by the [`corrector`] and paged
//! by the [`layout`] engine. Importers and exporters move documents in and
//! out of Fountain, Final Draft, DOCX, Markdown, plain text and the legacy
//! project formats.

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod cancel;
pub mod config;
pub mod corrector;
pub mod export;
pub mod import;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod session;
pub mod statistics;
pub mod template;
pub mod xml;

pub use cancel::CancelToken;
pub use config::{AppConfig, ConfigError};
pub use session::{spawn_import, Job, Session, SessionError};
