//! Core types for casewatch: cursors, the canonical case schema, and the
//! validators every emitted record passes through.

pub mod case_ref;
pub mod config;
pub mod cursor;
pub mod extract;
pub mod hash;
pub mod headers;
pub mod record;
pub mod validate;

pub use config::StateConfig;
pub use cursor::{ConditionalHints, Cursor, CursorTier};
pub use extract::{ExtractError, Extractor, FetchedContent, RawCase};
pub use headers::Headers;
pub use record::{
    Address, Amount, CaseResult, CaseStatus, NormalizedCaseRecord, Party, PartyRole,
    SourceMetadata,
};
pub use validate::{ValidationError, validate_record, validate_source};
