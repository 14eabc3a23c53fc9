use crate::model::{Assignee, PullRequest, Repository, Result};
use tokio::process::Command;

const JSON_FIELDS: &str = "number,title,url,author,assignees,latestReviews,\
additions,deletions,changedFiles,files,createdAt,mergedAt";
const APPROVED: &str = "APPROVED";

pub type FetchProgress<'a> = Box<dyn FnMut(&str) + Send + 'a>;

pub trait GithubPullRequester {
    async fn fetch_pull_requests<'a>(
        &self,
        since: &Option<String>,
        limit: usize,
        cb: FetchProgress<'a>,
    ) -> Result<Vec<PullRequest>>;
}

impl GithubPullRequester for Repository {
    async fn fetch_pull_requests<'a>(
        &self,
        since: &Option<String>,
        limit: usize,
        mut cb: FetchProgress<'a>,
    ) -> Result<Vec<PullRequest>> {
        cb("Fetching merged pull requests ...");
        let mut command = Command::new("gh");
        command.args([
            "pr",
            "list",
            "--repo",
            &self.full_name(),
            "--state",
            "merged",
            "--limit",
            &limit.to_string(),
            "--json",
            JSON_FIELDS,
        ]);
        if let Some(since) = since {
            command.args(["--search", &format!("merged:>={since}")]);
        }

        let output = command.output().await?;
        if !output.status.success() {
            return Err(format!(
                "`gh pr list` failed for {}: {}",
                self.full_name(),
                String::from_utf8_lossy(&output.stderr).trim()
            )
            .into());
        }

        cb("Filtering pull requests ...");
        let pull_requests: Vec<PullRequest> = serde_json::from_slice(&output.stdout)?;
        Ok(prepare(pull_requests))
    }
}

/// Filters applied before a snapshot is stored. The aggregation engine
/// relies on these as preconditions and never re-checks them.
fn prepare(pull_requests: Vec<PullRequest>) -> Vec<PullRequest> {
    pull_requests
        .into_iter()
        .filter(|pull_request| !pull_request.author.is_bot)
        .map(assign_author_when_unassigned)
        .map(keep_approved_reviews)
        .collect()
}

fn assign_author_when_unassigned(mut pull_request: PullRequest) -> PullRequest {
    if pull_request.assignees.is_empty() {
        pull_request.assignees.push(Assignee {
            login: pull_request.author.login.clone(),
            name: pull_request.author.name.clone(),
        });
    }
    pull_request
}

fn keep_approved_reviews(mut pull_request: PullRequest) -> PullRequest {
    pull_request
        .latest_reviews
        .retain(|review| review.state == APPROVED);
    pull_request
}
