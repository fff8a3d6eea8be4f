//! Core domain types for review notes.
//!
//! Module hierarchy follows type dependency order:
//! - identity: AccountId, Identity and its canonical text
//! - change: ChangeId, ChangeKey, ProjectName, CommitId, Change
//! - label: LabelDefinitions, vote rendering
//! - timezone: Timezone, fixed offsets and named zones
//! - note: NoteSettings, note content builder

pub mod change;
pub mod error;
pub mod identity;
pub mod label;
pub mod note;
pub mod timezone;

pub use change::{Approval, Change, ChangeId, ChangeKey, ChangeStatus, CommitId, ProjectName};
pub use error::{CoreError, InvalidId};
pub use identity::{AccountId, Identity, IdentityDisplay, format_identity};
pub use label::{LabelDefinitions, decisive_approval, format_vote};
pub use note::{NoteSettings, build_note};
pub use timezone::Timezone;
