//! Review note content.
//!
//! A note is a fixed sequence of `Header: value` lines, LF terminated:
//!
//! ```text
//! Change-Id: I8473b95934b5732ac55d26311a706c9c2bde9940
//! Code-Review+2: Jane Doe <jane@example.com>
//! Verified+1: Build Bot <ci@example.com>
//! Project: platform/core
//! Branch: refs/heads/main
//! Submitted-by: Jane Doe <jane@example.com>
//! Submitted-at: Mon, 04 Feb 2013 17:46:40 +0000
//! Reviewed-on: https://review.example.com/42
//! ```
//!
//! Content is a pure function of the change, the label order and
//! [`NoteSettings`], so rebuilding a note yields identical bytes.

use std::fmt::Display;

use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use super::change::Change;
use super::error::CoreError;
use super::identity::Identity;
use super::label::{LabelDefinitions, decisive_approval, format_vote};
use super::timezone::Timezone;

const SUBMITTED_AT_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
);

/// Server-wide settings that shape note content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteSettings {
    pub timezone: Timezone,
    pub anonymous_label: String,
    canonical_base_url: String,
}

impl NoteSettings {
    pub fn new(
        timezone: impl Into<Timezone>,
        anonymous_label: impl Into<String>,
        canonical_base_url: impl Into<String>,
    ) -> Self {
        let mut url = canonical_base_url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        Self {
            timezone: timezone.into(),
            anonymous_label: anonymous_label.into(),
            canonical_base_url: url,
        }
    }

    /// Base URL, always ending in `/`.
    pub fn canonical_base_url(&self) -> &str {
        &self.canonical_base_url
    }

    fn identity(&self, identity: &Identity) -> String {
        identity.display(&self.anonymous_label).to_string()
    }

    fn submitted_at(&self, at: OffsetDateTime) -> Result<String, CoreError> {
        Ok(self.timezone.localize(at)?.format(SUBMITTED_AT_FORMAT)?)
    }
}

/// Build the note text for one merged change.
pub fn build_note(
    change: &Change,
    labels: &LabelDefinitions,
    settings: &NoteSettings,
) -> Result<String, CoreError> {
    let mut out = String::new();

    header(&mut out, "Change-Id", &change.key);
    for label in labels.iter() {
        if let Some(approval) = decisive_approval(&change.approvals, label) {
            header(
                &mut out,
                format_args!("{label}{}", format_vote(approval.value)),
                settings.identity(&approval.account),
            );
        }
    }
    header(&mut out, "Project", &change.project);
    header(&mut out, "Branch", &change.branch);
    header(&mut out, "Submitted-by", settings.identity(&change.submitter));
    header(&mut out, "Submitted-at", settings.submitted_at(change.submitted_at)?);
    header(
        &mut out,
        "Reviewed-on",
        format_args!("{}{}", settings.canonical_base_url(), change.id),
    );

    Ok(out)
}

fn header(out: &mut String, name: impl Display, value: impl Display) {
    out.push_str(&format!("{name}: {value}\n"));
}
