use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
pub struct GhUser {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub blog: Option<String>,
    pub twitter_username: Option<String>,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Embedded account, e.g. an issue author or a repository owner.
#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
pub struct GhActor {
    pub login: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
pub struct GhRepository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    pub html_url: String,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub topics: Vec<String>,
    pub owner: GhActor,
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
pub struct GhLabel {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
pub struct GhPullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub html_url: String,
    pub user: GhActor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub draft: bool,
    /// Only present on the single pull request endpoint.
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub review_comments: u64,
    #[serde(default)]
    pub labels: Vec<GhLabel>,
    #[serde(default)]
    pub assignees: Vec<GhActor>,
    #[serde(default)]
    pub requested_reviewers: Vec<GhActor>,
}

/// Marker GitHub attaches to issues which are actually pull requests.
#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
pub struct GhPullRequestRef {
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
pub struct GhIssue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub html_url: String,
    pub user: GhActor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub labels: Vec<GhLabel>,
    #[serde(default)]
    pub assignees: Vec<GhActor>,
    pub pull_request: Option<GhPullRequestRef>,
    /// Only present on search results.
    pub repository_url: Option<String>,
}

impl GhIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
pub struct GhComment {
    pub id: u64,
    pub body: Option<String>,
    pub user: GhActor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub html_url: String,
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
pub struct GhCommit {
    pub sha: String,
    pub commit: GhCommitDetail,
    pub author: Option<GhActor>,
    pub committer: Option<GhActor>,
    pub html_url: String,
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
pub struct GhCommitDetail {
    pub author: GhCommitActor,
    pub committer: GhCommitActor,
    pub message: String,
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
pub struct GhCommitActor {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GhReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
pub struct GhReview {
    pub id: u64,
    pub user: Option<GhActor>,
    pub body: Option<String>,
    pub state: GhReviewState,
    pub html_url: String,
    /// Missing on pending reviews.
    pub submitted_at: Option<DateTime<Utc>>,
    pub commit_id: Option<String>,
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
pub struct GhContributor {
    pub login: Option<String>,
    pub id: Option<u64>,
    pub avatar_url: Option<String>,
    pub contributions: u64,
    pub r#type: String,
}

#[derive(Deserialize, PartialEq, Clone, Debug)]
pub struct GhSearchResults<T> {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<T>,
}
