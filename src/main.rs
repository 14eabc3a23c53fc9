mod analyze;
mod github;
mod ignore;
mod model;
mod report;
mod storage;
mod utils;

use crate::analyze::{Analysis, Analyzer, DataSet};
use crate::github::GithubPullRequester;
use crate::ignore::IgnoreRules;
use crate::model::{PullRequest, Repository, Result};
use crate::report::MarkdownReport;
use crate::utils::{MultiProgressNew, ProgressStyleTemplate};
use chrono::Utc;
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar};
use std::process::ExitCode;

#[derive(Parser, Debug, Clone)]
struct Args {
    /// Repositories to report on, as comma-separated `owner/name` ids
    #[arg(long = "repos", env = "PR_REPORT_REPOS", value_delimiter = ',')]
    repos: Vec<String>,
    /// Only fetch pull requests merged on or after this date (YYYY-MM-DD)
    #[arg(long = "since", env = "PR_REPORT_SINCE")]
    since: Option<String>,
    /// Maximum pull requests fetched per repository
    #[arg(long = "limit", env = "PR_REPORT_LIMIT", default_value = "200")]
    limit: usize,
    #[arg(long = "data_dir", default_value = "data")]
    data_dir: String,
    #[arg(long = "ignore_rules", default_value = "ignore-rules.json")]
    ignore_rules_path: String,
    #[arg(long = "output", default_value = "pr-report.md")]
    output_path: String,
    /// Reuse stored pull request data instead of calling `gh`
    #[arg(long = "skip_fetch")]
    skip_fetch: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    if !args.skip_fetch {
        let repos = Repository::from_args(&args.repos)?;
        for repo in &repos {
            // One repository at a time: `gh` does not support safe
            // concurrent invocation, and a failed repository must not take
            // the others down with it.
            if let Err(error) = repo_fetch(repo, args).await {
                eprintln!("⚠️  Skipping {}: {error}", repo.full_name());
            }
        }
    }

    let (ignore_rules, stored) = load_inputs(args).await;
    let stored = stored?;

    let mut data_set = DataSet::new(ignore_rules);
    for (repository, pull_requests) in stored {
        data_set.insert_pull_requests(&repository, pull_requests);
    }

    let analysis = data_set.analyze()?;
    analysis.report_create(&args.output_path, &Utc::now())?;
    print_summary(&analysis, &args.output_path);
    Ok(())
}

async fn repo_fetch(repo: &Repository, args: &Args) -> Result<()> {
    let multi_progress = MultiProgress::default();
    multi_progress.println(format!("# {}", repo.full_name()))?;

    let fetch_pb = multi_progress.add_with_style(
        ProgressBar::new_spinner(),
        ProgressStyleTemplate::only_message(),
    );
    fetch_pb.set_message("Waiting for `gh` ...");

    let progress_pb = fetch_pb.clone();
    let progress = move |message: &str| {
        progress_pb.set_message(message.to_string());
    };
    let pull_requests = repo
        .fetch_pull_requests(&args.since, args.limit, Box::new(progress))
        .await?;

    let path = storage::store_pull_requests(&args.data_dir, repo, &pull_requests)?;
    fetch_pb.finish_with_message(format!(
        "✅ Stored {} pull requests to `{}`",
        pull_requests.len(),
        path.display()
    ));
    Ok(())
}

async fn load_inputs(args: &Args) -> (IgnoreRules, Result<Vec<(Repository, Vec<PullRequest>)>>) {
    let multi_progress = MultiProgress::default();
    let rules_pb = multi_progress.add_with_style(
        ProgressBar::no_length(),
        ProgressStyleTemplate::only_message(),
    );
    let stored_pb = multi_progress.add_with_style(
        ProgressBar::no_length(),
        ProgressStyleTemplate::only_message(),
    );

    let rules_path = args.ignore_rules_path.clone();
    let data_dir = args.data_dir.clone();

    futures::join!(
        async move {
            rules_pb.set_message(format!("Read ignore rules `{rules_path}` ..."));
            let rules = IgnoreRules::load_or_default(&rules_path);
            rules_pb.finish_with_message(format!(
                "✅ Loaded ignore rules for {} repositories",
                rules.len()
            ));
            rules
        },
        async move {
            stored_pb.set_message(format!("Read stored pull requests from `{data_dir}` ..."));
            let stored = storage::load_stored(&data_dir);
            match &stored {
                Ok(stored) => stored_pb.finish_with_message(format!(
                    "✅ Loaded {} repository data files",
                    stored.len()
                )),
                Err(_) => stored_pb.finish_with_message("No stored pull request data"),
            }
            stored
        },
    )
}

fn print_summary(analysis: &Analysis, output_path: &str) {
    if let Some((login, count)) = analysis.overall.pull_requests_by_assignee.winner() {
        println!("Most pull requests: {login} ({count})");
    }
    if let Some((login, count)) = analysis.overall.reviews_by_approver.winner() {
        println!("Most reviews: {login} ({count})");
    }
    println!("Report saved to `{output_path}`");
}
