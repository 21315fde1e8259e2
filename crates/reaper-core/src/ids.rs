//! Shared identifier types.
//!
//! Policy and rule ids are author-chosen stable strings (per the document
//! format); request and audit-record ids are server-generated UUIDs, the
//! same convention the teacher used for `PolicyId` before this crate's
//! policies became externally-authored documents.

use uuid::Uuid;

pub type PolicyId = String;
pub type RuleId = String;
pub type RequestId = Uuid;
pub type RecordId = Uuid;
