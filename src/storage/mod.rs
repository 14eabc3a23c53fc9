use crate::model::{PullRequest, Repository, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes one repository's snapshot independently, so a later failure on
/// another repository cannot lose it.
pub fn store_pull_requests(
    dir: &str,
    repository: &Repository,
    pull_requests: &[PullRequest],
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = Path::new(dir).join(repository.storage_file_name());
    fs::write(&path, serde_json::to_string_pretty(pull_requests)?)?;
    Ok(path)
}

/// Loads every stored snapshot, in sorted file-name order. A snapshot that
/// fails to read or parse is reported and skipped; a missing directory or an
/// empty one is an error.
pub fn load_stored(dir: &str) -> Result<Vec<(Repository, Vec<PullRequest>)>> {
    let entries = fs::read_dir(dir)
        .map_err(|_| format!("No stored pull request data directory `{dir}`"))?;
    let mut file_names = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|file_name| Repository::from_storage_file_name(file_name).is_some())
        .collect::<Vec<_>>();
    file_names.sort();

    let mut stored = Vec::new();
    for file_name in &file_names {
        let Some(repository) = Repository::from_storage_file_name(file_name) else {
            continue;
        };
        let path = Path::new(dir).join(file_name);
        match read_snapshot(&path) {
            Ok(pull_requests) => stored.push((repository, pull_requests)),
            Err(error) => eprintln!("⚠️  Skipping `{file_name}`: {error}"),
        }
    }

    if stored.is_empty() {
        return Err(format!("No pull request data files found under `{dir}`").into());
    }
    Ok(stored)
}

fn read_snapshot(path: &Path) -> Result<Vec<PullRequest>> {
    let json_str = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json_str)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Author;

    fn pull_request(number: u64) -> PullRequest {
        PullRequest {
            number,
            title: format!("PR {number}"),
            url: format!("https://example.com/{number}"),
            author: Author {
                login: "u1".to_string(),
                name: String::new(),
                is_bot: false,
            },
            assignees: vec![],
            latest_reviews: vec![],
            additions: 0,
            deletions: 0,
            changed_files: 0,
            files: vec![],
            created_at: None,
            merged_at: None,
        }
    }

    #[test]
    fn stores_and_loads_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_string_lossy().to_string();
        let alpha = Repository::parse("octo-org/alpha").unwrap();
        let beta = Repository::parse("octo-org/beta").unwrap();

        store_pull_requests(&dir_path, &beta, &[pull_request(2)]).unwrap();
        store_pull_requests(&dir_path, &alpha, &[pull_request(1)]).unwrap();

        let stored = load_stored(&dir_path).unwrap();
        // Sorted file-name order keeps runs deterministic.
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].0, alpha);
        assert_eq!(stored[0].1[0].number, 1);
        assert_eq!(stored[1].0, beta);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(load_stored("definitely/not/here").is_err());
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_stored(&dir.path().to_string_lossy()).is_err());
    }

    #[test]
    fn malformed_snapshot_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_string_lossy().to_string();
        let alpha = Repository::parse("octo-org/alpha").unwrap();
        store_pull_requests(&dir_path, &alpha, &[pull_request(1)]).unwrap();
        fs::write(dir.path().join("octo-org__broken.json"), "not json").unwrap();

        let stored = load_stored(&dir_path).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, alpha);
    }
}
