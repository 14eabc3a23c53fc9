use crate::analyze::model::{Analysis, DataSet, Leaderboards, RepoBucket, RepoPullRequest};
use crate::model::Result;
use indexmap::IndexMap;
use itertools::Itertools;

pub trait Analyzer {
    fn analyze(&self) -> Result<Analysis>;
}

impl Analyzer for DataSet {
    /// Builds the global leaderboards plus one bucket per repository, both
    /// from the same constructor and ignore policy. An empty collection is
    /// rejected up front: the leaderboard construction has no meaningful
    /// winners or averages over zero pull requests.
    fn analyze(&self) -> Result<Analysis> {
        if self.pull_requests.is_empty() {
            return Err("No pull requests collected, nothing to analyze".into());
        }

        let overall = Leaderboards::from_pull_requests(&self.pull_requests, &self.ignore_rules);

        let mut subsets: IndexMap<String, Vec<RepoPullRequest>> = IndexMap::new();
        for tagged in &self.pull_requests {
            subsets
                .entry(tagged.repository.clone())
                .or_default()
                .push(tagged.clone());
        }

        let repositories = subsets
            .into_iter()
            .sorted_by(|(id_a, _), (id_b, _)| id_a.cmp(id_b))
            .map(|(repository, pull_requests)| {
                let boards = Leaderboards::from_pull_requests(&pull_requests, &self.ignore_rules);
                RepoBucket {
                    repository,
                    pull_requests,
                    boards,
                }
            })
            .collect();

        Ok(Analysis {
            overall,
            repositories,
        })
    }
}
