//! Label definitions and vote rendering.

use serde::{Deserialize, Serialize};

use super::change::Approval;
use super::error::{CoreError, InvalidId};

/// Ordered list of label names; note approval lines follow this order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelDefinitions(Vec<String>);

impl LabelDefinitions {
    pub fn new<I, S>(names: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut labels: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            validate_label(&name)?;
            if !labels.contains(&name) {
                labels.push(name);
            }
        }
        Ok(Self(labels))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for LabelDefinitions {
    fn default() -> Self {
        Self(vec!["Code-Review".to_string(), "Verified".to_string()])
    }
}

impl TryFrom<Vec<String>> for LabelDefinitions {
    type Error = CoreError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<LabelDefinitions> for Vec<String> {
    fn from(labels: LabelDefinitions) -> Self {
        labels.0
    }
}

fn validate_label(name: &str) -> Result<(), CoreError> {
    let reason = if name.is_empty() {
        "empty"
    } else if name.contains(':') || name.chars().any(char::is_whitespace) {
        "must not contain ':' or whitespace"
    } else {
        return Ok(());
    };
    Err(InvalidId::Label {
        raw: name.to_string(),
        reason: reason.into(),
    }
    .into())
}

/// Render a vote the way review UIs do: `+2`, `-1`, ` 0`.
pub fn format_vote(value: i16) -> String {
    match value {
        v if v > 0 => format!("+{v}"),
        0 => " 0".to_string(),
        v => v.to_string(),
    }
}

/// Pick the vote that decides `label`.
///
/// Zero votes are ignored. The greatest magnitude wins; among equal
/// magnitudes the approval recorded last wins.
pub fn decisive_approval<'a>(approvals: &'a [Approval], label: &str) -> Option<&'a Approval> {
    approvals
        .iter()
        .filter(|a| a.label == label && a.value != 0)
        .fold(None, |best: Option<&Approval>, a| match best {
            Some(b) if b.value.unsigned_abs() > a.value.unsigned_abs() => Some(b),
            _ => Some(a),
        })
}
