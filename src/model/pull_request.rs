use serde::{Deserialize, Serialize};

/// One pull request as stored in a repository snapshot. The field names
/// mirror the `gh pr list --json` output so the fetched documents round-trip
/// through storage unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: Author,
    #[serde(default)]
    pub assignees: Vec<Assignee>,
    #[serde(default)]
    pub latest_reviews: Vec<Review>,
    #[serde(default)]
    pub additions: usize,
    #[serde(default)]
    pub deletions: usize,
    #[serde(default)]
    pub changed_files: usize,
    #[serde(default)]
    pub files: Vec<FileChange>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub merged_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub login: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignee {
    pub login: String,
    #[serde(default)]
    pub name: String,
}

impl Assignee {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.login
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub author: Reviewer,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reviewer {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    #[serde(default)]
    pub additions: usize,
    #[serde(default)]
    pub deletions: usize,
}
