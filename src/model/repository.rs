use crate::model::Result;

#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

// Create
impl Repository {
    pub fn from_args(ids: &[String]) -> Result<Vec<Self>> {
        ids.iter().map(|id| Self::parse(id)).collect()
    }

    fn new(owner: impl ToString, name: impl ToString) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }
}

// Parser
impl Repository {
    pub fn parse(id: &str) -> Result<Self> {
        let Some((owner, name)) = id.split_once('/') else {
            return Err(format!("Not a valid repository id (expected `owner/name`): `{id}`").into());
        };
        if owner.is_empty() || name.is_empty() {
            return Err(format!("Not a valid repository id (expected `owner/name`): `{id}`").into());
        }
        Ok(Self::new(owner, name))
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

// Storage naming. GitHub owner names never contain underscores, so the
// first `__` splits the stem unambiguously.
impl Repository {
    pub fn storage_file_name(&self) -> String {
        format!("{}__{}.json", self.owner, self.name)
    }

    pub fn from_storage_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".json")?;
        let (owner, name) = stem.split_once("__")?;
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(owner, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_owner_and_name() {
        let repo = Repository::parse("octo-org/widgets").unwrap();
        assert_eq!(repo.owner, "octo-org");
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.full_name(), "octo-org/widgets");
    }

    #[test]
    fn rejects_ids_without_separator() {
        assert!(Repository::parse("widgets").is_err());
        assert!(Repository::parse("/widgets").is_err());
        assert!(Repository::parse("octo-org/").is_err());
    }

    #[test]
    fn storage_file_name_round_trips() {
        let repo = Repository::parse("octo-org/my_widgets").unwrap();
        let restored = Repository::from_storage_file_name(&repo.storage_file_name()).unwrap();
        assert_eq!(restored, repo);
    }

    #[test]
    fn ignores_files_that_are_not_snapshots() {
        assert!(Repository::from_storage_file_name("notes.txt").is_none());
        assert!(Repository::from_storage_file_name("stray.json").is_none());
    }
}
