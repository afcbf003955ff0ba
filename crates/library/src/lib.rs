mod consts;
pub mod date;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod hash;
pub mod naming;
pub mod pipeline;
pub mod scan;
pub mod scope;
pub mod summary;

pub use crate::event::{Event, EventSink};
pub use crate::pipeline::{Context, run};
pub use crate::summary::{Category, Summary};
