//! Checked document types.

mod revision;
mod status;

pub(crate) use revision::split_revision_name;
pub use revision::{FieldDescriptor, ResourceRevision, RevisionSchema, TIMESTAMP_TYPE};
pub use status::{
    Detail, DetailType, ErrorInfo, Help, HelpLink, LocalizedMessage, MessageBindings,
    StatusPayload,
};
