use crate::analyze::model::{humanize_duration, Leaderboards, LocBoard, PullRequestRef};
use crate::analyze::Analysis;
use crate::model::Result;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use markdown_builder::Markdown;
use markdown_table::{Heading, HeadingAlignment, MarkdownTable};
use std::fs;

pub trait MarkdownReport {
    fn to_markdown(&self, generated_at: &DateTime<Utc>) -> String;
    fn report_create(&self, path: &str, generated_at: &DateTime<Utc>) -> Result<()>;
}

impl MarkdownReport for Analysis {
    /// Pure projection of the aggregates: two runs over the same input and
    /// rules differ only in the injected timestamp.
    fn to_markdown(&self, generated_at: &DateTime<Utc>) -> String {
        let mut doc = Markdown::new();
        doc.header1("Pull Request Report");
        doc.paragraph(format!(
            "Generated: {}",
            generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        doc.header2("Overall");
        doc.add_leaderboards(&self.overall, true);

        doc.header2("By Repository");
        for bucket in &self.repositories {
            doc.header3(bucket.repository.clone());
            doc.add_leaderboards(&bucket.boards, false);
        }

        doc.render()
    }

    fn report_create(&self, path: &str, generated_at: &DateTime<Utc>) -> Result<()> {
        fs::write(path, self.to_markdown(generated_at))?;
        Ok(())
    }
}

trait MarkdownExt {
    fn add_leaderboards(&mut self, boards: &Leaderboards, include_pairs: bool);
    fn add_assignee_table(&mut self, board: &LocBoard);
}

impl MarkdownExt for Markdown {
    fn add_leaderboards(&mut self, boards: &Leaderboards, include_pairs: bool) {
        let mut lines = vec![];
        if let Some((login, count)) = boards.pull_requests_by_assignee.winner() {
            lines.push(format!("- Most pull requests: **{login}** ({count})"));
        }
        if let Some((login, count)) = boards.reviews_by_approver.winner() {
            lines.push(format!("- Most reviews: **{login}** ({count})"));
        }
        self.paragraph(lines.join("\n"));

        self.add_assignee_table(&boards.loc_by_assignee);

        let mut lines = vec![];
        lines.push(format!(
            "- Total LOC: {} across {} pull requests (avg {:.1})",
            boards.total_loc,
            boards.pull_requests,
            boards.average_loc()
        ));
        if let Some((additions, request)) = boards.top_additions.get() {
            lines.push(format!("- Biggest additions: {additions} — {}", link(request)));
        }
        if let Some((deletions, request)) = boards.top_deletions.get() {
            lines.push(format!("- Biggest deletions: {deletions} — {}", link(request)));
        }
        if let Some((changed_files, request)) = boards.top_changed_files.get() {
            lines.push(format!(
                "- Biggest changed files: {changed_files} — {}",
                link(request)
            ));
        }
        if let Some((path, stat)) = boards.files.top_by(|stat| stat.additions) {
            lines.push(format!("- Busiest file (additions): `{path}` (+{})", stat.additions));
        }
        if let Some((path, stat)) = boards.files.top_by(|stat| stat.deletions) {
            lines.push(format!("- Busiest file (deletions): `{path}` (-{})", stat.deletions));
        }
        if let Some((path, stat)) = boards.files.top_by(|stat| stat.pull_requests) {
            lines.push(format!(
                "- Busiest file (pull requests): `{path}` ({} pull requests)",
                stat.pull_requests
            ));
        }
        if include_pairs {
            if let Some(((author, approver), count)) = boards.pairs.winner() {
                lines.push(format!(
                    "- Top collaborating pair: **{author}** & **{approver}** ({count})"
                ));
            }
        }
        if let Some((lead, request)) = boards.lead_times.shortest() {
            lines.push(format!(
                "- Shortest lead time: {} — {}",
                humanize_duration(lead),
                link(request)
            ));
        }
        if let Some((lead, request)) = boards.lead_times.longest() {
            lines.push(format!(
                "- Longest lead time: {} — {}",
                humanize_duration(lead),
                link(request)
            ));
        }
        if let Some((login, stat)) = boards.loc_by_reviewer.winner() {
            lines.push(format!(
                "- Top reviewer: **{login}** ({} LOC across {} pull requests)",
                stat.loc, stat.pull_requests
            ));
        }
        if let Some(record) = boards.top_review.get() {
            lines.push(format!(
                "- Biggest single review: **{}** — {} LOC on {} (assignees: {})",
                record.reviewer,
                record.loc,
                link(&record.request),
                record.assignees.iter().join(", ")
            ));
        }
        if let Some((login, stat)) = boards.loc_by_assignee.winner() {
            lines.push(format!(
                "- Top assignee: **{login}** ({} LOC across {} pull requests)",
                stat.loc, stat.pull_requests
            ));
        }
        self.paragraph(lines.join("\n"));
    }

    fn add_assignee_table(&mut self, board: &LocBoard) {
        let ranked = board.ranked();
        if ranked.is_empty() {
            return;
        }
        let headings = vec![
            Heading::new("Assignee".to_string(), None),
            Heading::new("LOC".to_string(), Some(HeadingAlignment::Center)),
            Heading::new("Pull requests".to_string(), Some(HeadingAlignment::Center)),
            Heading::new("Avg LOC".to_string(), Some(HeadingAlignment::Center)),
        ];
        let rows = ranked
            .iter()
            .map(|(login, stat)| {
                vec![
                    format!("**{login}**"),
                    stat.loc.to_string(),
                    stat.pull_requests.to_string(),
                    format!("{:.1}", stat.average()),
                ]
            })
            .collect::<Vec<_>>();
        let mut table = MarkdownTable::new(rows);
        table.with_headings(headings);
        self.paragraph(table.as_markdown().unwrap());
    }
}

fn link(request: &PullRequestRef) -> String {
    format!(
        "{} ([#{}]({}))",
        request.title, request.number, request.url
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::{Analyzer, DataSet};
    use crate::ignore::IgnoreRules;
    use crate::model::{Assignee, Author, FileChange, PullRequest, Repository, Review, Reviewer};
    use chrono::TimeZone;

    fn sample_analysis() -> Analysis {
        let mut data_set = DataSet::new(IgnoreRules::default());
        data_set.insert_pull_requests(
            &Repository::parse("x/beta").unwrap(),
            vec![PullRequest {
                number: 2,
                title: "Widget polish".to_string(),
                url: "https://example.com/2".to_string(),
                author: Author {
                    login: "u2".to_string(),
                    name: String::new(),
                    is_bot: false,
                },
                assignees: vec![Assignee {
                    login: "u2".to_string(),
                    name: "User Two".to_string(),
                }],
                latest_reviews: vec![Review {
                    author: Reviewer {
                        login: "u1".to_string(),
                    },
                    state: "APPROVED".to_string(),
                }],
                additions: 3,
                deletions: 1,
                changed_files: 1,
                files: vec![FileChange {
                    path: "src/polish.rs".to_string(),
                    additions: 3,
                    deletions: 1,
                }],
                created_at: Some("2025-01-01T00:00:00Z".to_string()),
                merged_at: Some("2025-01-02T01:00:00Z".to_string()),
            }],
        );
        data_set.insert_pull_requests(
            &Repository::parse("x/alpha").unwrap(),
            vec![PullRequest {
                number: 1,
                title: "Widget cache".to_string(),
                url: "https://example.com/1".to_string(),
                author: Author {
                    login: "u1".to_string(),
                    name: String::new(),
                    is_bot: false,
                },
                assignees: vec![Assignee {
                    login: "u1".to_string(),
                    name: String::new(),
                }],
                latest_reviews: vec![],
                additions: 10,
                deletions: 0,
                changed_files: 1,
                files: vec![FileChange {
                    path: "src/cache.rs".to_string(),
                    additions: 10,
                    deletions: 0,
                }],
                created_at: None,
                merged_at: None,
            }],
        );
        data_set.analyze().unwrap()
    }

    #[test]
    fn renders_overall_and_repository_sections() {
        let analysis = sample_analysis();
        let generated_at = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let markdown = analysis.to_markdown(&generated_at);

        assert!(markdown.contains("# Pull Request Report"));
        assert!(markdown.contains("Generated: 2025-01-15 12:00:00 UTC"));
        assert!(markdown.contains("## Overall"));
        assert!(markdown.contains("- Most pull requests: **u1** (1)"));
        assert!(markdown.contains("- Most reviews: **u1** (1)"));
        assert!(markdown.contains(
            "- Biggest additions: 10 — Widget cache ([#1](https://example.com/1))"
        ));
        assert!(markdown.contains("- Top collaborating pair: **u1** & **u2** (1)"));
        assert!(markdown.contains("- Shortest lead time: 1d 1h 0m — Widget polish"));
        assert!(markdown.contains("(assignees: User Two)"));
        assert!(markdown.contains("## By Repository"));
    }

    #[test]
    fn repository_sections_are_sorted_and_skip_pairs() {
        let analysis = sample_analysis();
        let generated_at = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let markdown = analysis.to_markdown(&generated_at);

        let alpha = markdown.find("### x/alpha").unwrap();
        let beta = markdown.find("### x/beta").unwrap();
        assert!(alpha < beta);

        // The pair leaderboard is global-only.
        let by_repository = &markdown[markdown.find("## By Repository").unwrap()..];
        assert!(!by_repository.contains("Top collaborating pair"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let generated_at = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let first = sample_analysis().to_markdown(&generated_at);
        let second = sample_analysis().to_markdown(&generated_at);
        assert_eq!(first, second);
    }
}
