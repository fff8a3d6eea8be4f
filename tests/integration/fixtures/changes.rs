use std::io;
use std::path::{Path, PathBuf};

use git2::Oid;
use reviewnotes::config::Config;
use reviewnotes::export::ExportContext;
use reviewnotes::feed::{ChangeSource, FeedError};
use reviewnotes::{
    AccountId, Approval, Change, ChangeId, ChangeKey, ChangeStatus, CommitId, Identity,
    ProjectName,
};
use time::OffsetDateTime;

pub const SUBMITTED_AT: i64 = 1_360_000_000;
pub const BASE_URL: &str = "https://review.example.com";

pub fn jane() -> Identity {
    Identity::new(
        AccountId::new(1000),
        Some("Jane Doe".into()),
        Some("jane@x.com".into()),
    )
}

pub fn ci_bot() -> Identity {
    Identity::new(
        AccountId::new(1001),
        Some("CI Bot".into()),
        Some("ci@example.com".into()),
    )
}

pub fn change_key(id: u32) -> String {
    format!("I{id:040x}")
}

/// Merged change `id` in `project` whose merge commit is `commit`, approved
/// with Code-Review+2 by Jane and Verified+1 by the CI bot.
pub fn merged_change(id: u32, project: &str, commit: Oid) -> Change {
    Change {
        id: ChangeId::new(id).expect("change id"),
        key: ChangeKey::parse(&change_key(id)).expect("change key"),
        project: ProjectName::parse(project).expect("project"),
        branch: "refs/heads/main".to_string(),
        status: ChangeStatus::Merged,
        approvals: vec![
            Approval {
                label: "Verified".into(),
                value: 1,
                account: ci_bot(),
            },
            Approval {
                label: "Code-Review".into(),
                value: 2,
                account: jane(),
            },
        ],
        submitter: jane(),
        merge_commit: CommitId::parse(&commit.to_string()).expect("commit id"),
        submitted_at: OffsetDateTime::from_unix_timestamp(SUBMITTED_AT).expect("timestamp"),
    }
}

/// The note `merged_change(id, project, _)` renders to with default settings.
pub fn expected_note(id: u32, project: &str) -> String {
    format!(
        "Change-Id: {key}\n\
         Code-Review+2: Jane Doe <jane@x.com>\n\
         Verified+1: CI Bot <ci@example.com>\n\
         Project: {project}\n\
         Branch: refs/heads/main\n\
         Submitted-by: Jane Doe <jane@x.com>\n\
         Submitted-at: Mon, 04 Feb 2013 17:46:40 +0000\n\
         Reviewed-on: {BASE_URL}/{id}\n",
        key = change_key(id),
    )
}

pub fn config(base: &Path) -> Config {
    Config {
        base_path: base.to_path_buf(),
        canonical_base_url: BASE_URL.to_string(),
        ..Config::default()
    }
}

pub fn context(base: &Path) -> ExportContext {
    ExportContext::from_config(&config(base))
}

/// Write `changes` as a JSON Lines feed file and return its path.
pub fn write_feed(dir: &Path, changes: &[Change]) -> PathBuf {
    let path = dir.join("changes.jsonl");
    let mut contents = String::new();
    for change in changes {
        contents.push_str(&serde_json::to_string(change).expect("serialize change"));
        contents.push('\n');
    }
    std::fs::write(&path, contents).expect("write feed");
    path
}

/// A change feed whose backing database is gone.
pub struct UnavailableFeed;

impl ChangeSource for UnavailableFeed {
    fn merged_changes(&self) -> Result<Vec<Change>, FeedError> {
        Err(FeedError::Unavailable {
            path: PathBuf::from("/nonexistent/changes.jsonl"),
            source: io::Error::new(io::ErrorKind::NotFound, "database offline"),
        })
    }

    fn change_for_commit(
        &self,
        _project: &ProjectName,
        _commit: Oid,
    ) -> Result<Option<Change>, FeedError> {
        Ok(None)
    }
}
