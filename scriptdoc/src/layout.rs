//! Pagination engine
//!
//! Measures every paragraph against its template rule ([`metrics`]), flows
//! the measurements onto pages ([`flow`]) under the keep-with-next, widow
//! and dialogue continuation rules, numbers scenes ([`numbering`]) and
//! estimates durations ([`duration`]). [`PaginationEngine`] drives the
//! passes and reuses unaffected pages after an edit.

pub mod duration;
pub mod engine;
pub mod error;
pub mod flow;
pub mod metrics;
pub mod numbering;
pub mod page;

pub use duration::{blend_estimates, paragraph_estimates, Estimates};
pub use engine::{EngineState, LayoutCell, LayoutSettings, PaginationEngine};
pub use error::LayoutError;
pub use metrics::{wrap_text, Measurement};
pub use numbering::{assign_scene_numbers, number_document, Numbering, SceneSlot};
pub use page::{Fragment, FragmentRole, Layout, Page, Placement, SceneInfo};
