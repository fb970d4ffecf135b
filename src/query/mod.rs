// Submodules for separation of concerns
mod eval;
mod index;
mod pipeline;
mod render;
mod types;

// Public API re-exports
pub use eval::{apply_update, compare_bson, compare_docs, eval_filter, project_fields};
pub use index::IndexSpec;
pub use pipeline::{Accumulator, Group, GroupId, Stage, pipeline_documents, run_pipeline};
pub use render::{projection_document, sort_document};
pub use types::{
    CmpOp, DeleteReport, Filter, FindOptions, Order, SortSpec, UpdateDoc, UpdateReport,
};
