use crate::ignore::IgnoreRules;
use crate::model::{PullRequest, Repository};
use chrono::{DateTime, Duration};
use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::HashSet;

/// A pull request tagged with the repository it was loaded from.
#[derive(Debug, Clone)]
pub struct RepoPullRequest {
    pub repository: String,
    pub request: PullRequest,
}

/// The full working set for one run: every loaded pull request plus the
/// ignore policy they are measured under.
#[derive(Debug, Clone)]
pub struct DataSet {
    pub ignore_rules: IgnoreRules,
    pub pull_requests: Vec<RepoPullRequest>,
}

impl DataSet {
    pub fn new(ignore_rules: IgnoreRules) -> Self {
        Self {
            ignore_rules,
            pull_requests: vec![],
        }
    }

    pub fn insert_pull_requests(
        &mut self,
        repository: &Repository,
        pull_requests: Vec<PullRequest>,
    ) {
        let repository = repository.full_name();
        self.pull_requests
            .extend(pull_requests.into_iter().map(|request| RepoPullRequest {
                repository: repository.clone(),
                request,
            }));
    }
}

/// Line counts left after the ignore policy is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectiveMetrics {
    pub additions: usize,
    pub deletions: usize,
    pub changed_files: usize,
}

impl EffectiveMetrics {
    pub fn of(repository: &str, request: &PullRequest, rules: &IgnoreRules) -> Self {
        if request.files.is_empty() {
            return Self::from_raw_totals(request);
        }
        request
            .files
            .iter()
            .filter(|file| !rules.should_ignore(repository, &file.path))
            .fold(Self::default(), |mut acc, file| {
                acc.additions += file.additions;
                acc.deletions += file.deletions;
                acc.changed_files += 1;
                acc
            })
    }

    /// Per-file rules cannot be applied without a file list, so a pull
    /// request without one reports its raw totals unfiltered.
    fn from_raw_totals(request: &PullRequest) -> Self {
        Self {
            additions: request.additions,
            deletions: request.deletions,
            changed_files: request.changed_files,
        }
    }

    pub fn loc(&self) -> usize {
        self.additions + self.deletions
    }
}

#[derive(Debug, Clone, Default)]
pub struct CountBoard {
    counts: IndexMap<String, usize>,
}

impl CountBoard {
    fn bump(&mut self, key: &str) {
        *self.counts.entry(key.to_string()).or_insert(0) += 1;
    }

    /// Highest count wins; equal counts resolve alphabetically by key.
    pub fn winner(&self) -> Option<(&str, usize)> {
        self.counts
            .iter()
            .sorted_by(|(key_a, count_a), (key_b, count_b)| {
                count_b.cmp(count_a).then_with(|| key_a.cmp(key_b))
            })
            .next()
            .map(|(key, count)| (key.as_str(), *count))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocStat {
    pub loc: usize,
    pub pull_requests: usize,
}

impl LocStat {
    pub fn average(&self) -> f64 {
        if self.pull_requests == 0 {
            0.0
        } else {
            self.loc as f64 / self.pull_requests as f64
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocBoard {
    totals: IndexMap<String, LocStat>,
}

impl LocBoard {
    fn add(&mut self, key: &str, loc: usize) {
        let stat = self.totals.entry(key.to_string()).or_default();
        stat.loc += loc;
        stat.pull_requests += 1;
    }

    pub fn winner(&self) -> Option<(&str, &LocStat)> {
        self.ranked().into_iter().next()
    }

    /// Descending by total LOC; equal totals resolve alphabetically by key.
    pub fn ranked(&self) -> Vec<(&str, &LocStat)> {
        self.totals
            .iter()
            .sorted_by(|(key_a, stat_a), (key_b, stat_b)| {
                stat_b.loc.cmp(&stat_a.loc).then_with(|| key_a.cmp(key_b))
            })
            .map(|(key, stat)| (key.as_str(), stat))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&LocStat> {
        self.totals.get(key)
    }

    pub fn total_loc(&self) -> usize {
        self.totals.values().map(|stat| stat.loc).sum()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileStat {
    pub additions: usize,
    pub deletions: usize,
    pub pull_requests: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FileBoard {
    files: IndexMap<String, FileStat>,
}

impl FileBoard {
    fn add(&mut self, path: &str, additions: usize, deletions: usize, first_in_pull_request: bool) {
        let stat = self.files.entry(path.to_string()).or_default();
        stat.additions += additions;
        stat.deletions += deletions;
        if first_in_pull_request {
            stat.pull_requests += 1;
        }
    }

    pub fn top_by<F>(&self, metric: F) -> Option<(&str, &FileStat)>
    where
        F: Fn(&FileStat) -> usize,
    {
        self.files
            .iter()
            .sorted_by(|(path_a, stat_a), (path_b, stat_b)| {
                metric(*stat_b)
                    .cmp(&metric(*stat_a))
                    .then_with(|| path_a.cmp(path_b))
            })
            .next()
            .map(|(path, stat)| (path.as_str(), stat))
    }

    pub fn get(&self, path: &str) -> Option<&FileStat> {
        self.files.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PairBoard {
    counts: IndexMap<(String, String), usize>,
}

impl PairBoard {
    /// Keys are normalized by sorting the two logins; self-pairs never count.
    fn bump(&mut self, author: &str, approver: &str) {
        if author == approver {
            return;
        }
        let pair = if author < approver {
            (author.to_string(), approver.to_string())
        } else {
            (approver.to_string(), author.to_string())
        };
        *self.counts.entry(pair).or_insert(0) += 1;
    }

    pub fn winner(&self) -> Option<(&(String, String), usize)> {
        self.counts
            .iter()
            .sorted_by(|(pair_a, count_a), (pair_b, count_b)| {
                count_b.cmp(count_a).then_with(|| pair_a.cmp(pair_b))
            })
            .next()
            .map(|(pair, count)| (pair, *count))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub number: u64,
    pub title: String,
    pub url: String,
}

impl PullRequestRef {
    fn of(request: &PullRequest) -> Self {
        Self {
            number: request.number,
            title: request.title.clone(),
            url: request.url.clone(),
        }
    }
}

/// Single-winner tracker. Strict `>` keeps the first candidate on ties.
#[derive(Debug, Clone, Default)]
pub struct TopPullRequest {
    best: Option<(usize, PullRequestRef)>,
}

impl TopPullRequest {
    fn consider(&mut self, value: usize, request: &PullRequest) {
        if self.best.as_ref().map_or(true, |(best, _)| value > *best) {
            self.best = Some((value, PullRequestRef::of(request)));
        }
    }

    pub fn get(&self) -> Option<(usize, &PullRequestRef)> {
        self.best.as_ref().map(|(value, reference)| (*value, reference))
    }
}

#[derive(Debug, Clone)]
pub struct ReviewRecord {
    pub reviewer: String,
    pub loc: usize,
    pub request: PullRequestRef,
    pub assignees: Vec<String>,
}

/// The largest single-PR review contribution seen so far.
#[derive(Debug, Clone, Default)]
pub struct TopReview {
    best: Option<ReviewRecord>,
}

impl TopReview {
    fn consider(&mut self, reviewer: &str, loc: usize, request: &PullRequest) {
        if self.best.as_ref().map_or(true, |best| loc > best.loc) {
            self.best = Some(ReviewRecord {
                reviewer: reviewer.to_string(),
                loc,
                request: PullRequestRef::of(request),
                assignees: request
                    .assignees
                    .iter()
                    .map(|assignee| assignee.display_name().to_string())
                    .collect(),
            });
        }
    }

    pub fn get(&self) -> Option<&ReviewRecord> {
        self.best.as_ref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeadTimeBoard {
    shortest: Option<(Duration, PullRequestRef)>,
    longest: Option<(Duration, PullRequestRef)>,
}

impl LeadTimeBoard {
    fn consider(&mut self, request: &PullRequest) {
        let Some(lead) = lead_time(request) else {
            return;
        };
        if self.shortest.as_ref().map_or(true, |(best, _)| lead < *best) {
            self.shortest = Some((lead, PullRequestRef::of(request)));
        }
        if self.longest.as_ref().map_or(true, |(best, _)| lead > *best) {
            self.longest = Some((lead, PullRequestRef::of(request)));
        }
    }

    pub fn shortest(&self) -> Option<(&Duration, &PullRequestRef)> {
        self.shortest.as_ref().map(|(lead, request)| (lead, request))
    }

    pub fn longest(&self) -> Option<(&Duration, &PullRequestRef)> {
        self.longest.as_ref().map(|(lead, request)| (lead, request))
    }
}

/// Merge minus creation. Missing or unparseable timestamps, and negative
/// spans, all count as "no lead time" rather than an error.
pub fn lead_time(request: &PullRequest) -> Option<Duration> {
    let created = DateTime::parse_from_rfc3339(request.created_at.as_deref()?).ok()?;
    let merged = DateTime::parse_from_rfc3339(request.merged_at.as_deref()?).ok()?;
    let lead = merged.signed_duration_since(created);
    (lead >= Duration::zero()).then_some(lead)
}

/// Day/hour/minute breakdown; bare seconds only under one minute.
pub fn humanize_duration(duration: &Duration) -> String {
    let total_seconds = duration.num_seconds();
    if total_seconds < 60 {
        return format!("{total_seconds}s");
    }
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Every leaderboard over one pull request sequence. Built identically for
/// the global scope and for each repository subset, which keeps repository
/// sums a strict partition of the global sums.
#[derive(Debug, Clone, Default)]
pub struct Leaderboards {
    pub pull_requests: usize,
    pub total_loc: usize,
    pub pull_requests_by_assignee: CountBoard,
    pub reviews_by_approver: CountBoard,
    pub loc_by_assignee: LocBoard,
    pub loc_by_reviewer: LocBoard,
    pub files: FileBoard,
    pub pairs: PairBoard,
    pub top_additions: TopPullRequest,
    pub top_deletions: TopPullRequest,
    pub top_changed_files: TopPullRequest,
    pub top_review: TopReview,
    pub lead_times: LeadTimeBoard,
}

impl Leaderboards {
    pub fn from_pull_requests(pull_requests: &[RepoPullRequest], rules: &IgnoreRules) -> Self {
        let mut boards = Self::default();
        for tagged in pull_requests {
            boards.insert(tagged, rules);
        }
        boards
    }

    fn insert(&mut self, tagged: &RepoPullRequest, rules: &IgnoreRules) {
        let request = &tagged.request;
        let effective = EffectiveMetrics::of(&tagged.repository, request, rules);
        let loc = effective.loc();

        self.pull_requests += 1;
        self.total_loc += loc;

        for assignee in &request.assignees {
            self.pull_requests_by_assignee.bump(&assignee.login);
            self.loc_by_assignee.add(&assignee.login, loc);
        }

        for review in &request.latest_reviews {
            self.reviews_by_approver.bump(&review.author.login);
            self.pairs.bump(&request.author.login, &review.author.login);
        }

        // One LOC contribution per reviewer per pull request, however many
        // approval entries the upstream data carries for them.
        for reviewer in request
            .latest_reviews
            .iter()
            .map(|review| review.author.login.as_str())
            .unique()
        {
            self.loc_by_reviewer.add(reviewer, loc);
            self.top_review.consider(reviewer, loc, request);
        }

        self.top_additions.consider(effective.additions, request);
        self.top_deletions.consider(effective.deletions, request);
        self.top_changed_files.consider(effective.changed_files, request);

        // The per-PR guard keeps a path that reappears inside one diff from
        // inflating the distinct-PR count.
        let mut seen_paths = HashSet::new();
        for file in &request.files {
            if rules.should_ignore(&tagged.repository, &file.path) {
                continue;
            }
            self.files.add(
                &file.path,
                file.additions,
                file.deletions,
                seen_paths.insert(file.path.as_str()),
            );
        }

        self.lead_times.consider(request);
    }

    pub fn average_loc(&self) -> f64 {
        if self.pull_requests == 0 {
            0.0
        } else {
            self.total_loc as f64 / self.pull_requests as f64
        }
    }
}

/// One repository's complete copy of the aggregate state.
#[derive(Debug, Clone)]
pub struct RepoBucket {
    pub repository: String,
    pub pull_requests: Vec<RepoPullRequest>,
    pub boards: Leaderboards,
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub overall: Leaderboards,
    pub repositories: Vec<RepoBucket>,
}
