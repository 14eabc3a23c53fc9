mod pull_request;
mod repository;
mod result;

pub use pull_request::{Assignee, Author, FileChange, PullRequest, Review, Reviewer};
pub use repository::Repository;
pub use result::Result;
