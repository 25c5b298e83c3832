// File: ./src/model/mod.rs
pub mod item;
pub mod matcher;
pub mod shift;

pub use item::{
    Annotation, CHECKLIST_PREFIX, DATE_FORMAT, InvalidDate, MARKER, MarkerGap, MatchMode,
    Replacement, ShiftPolicy, TaskMatch, format_annotation,
};
