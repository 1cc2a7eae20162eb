//! In-memory GitHub for aggregation tests.

use crate::{
    error::GitHubError,
    github_client::{Affiliation, CommitFilter, GitHubClient, ItemState, PageRequest},
    github_models::*,
    RepositoryId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

type ClientResult<T> = Result<T, GitHubError>;

#[derive(Default, Debug)]
pub struct FakeClient {
    pub user: Option<GhUser>,
    pub repositories: Vec<GhRepository>,
    /// `owner/name` of repositories answering with 403.
    pub forbidden: HashSet<String>,
    pub contributors: HashMap<String, Vec<GhContributor>>,
    pub pull_requests: HashMap<String, Vec<GhPullRequest>>,
    /// May contain pull requests, as the real endpoint does.
    pub issues: HashMap<String, Vec<GhIssue>>,
    pub reviews: HashMap<(String, u64), Vec<GhReview>>,
    pub issue_comments: HashMap<(String, u64), Vec<GhComment>>,
    pub pull_request_comments: HashMap<(String, u64), Vec<GhComment>>,
    pub commits: HashMap<String, Vec<GhCommit>>,
    /// Search results keyed by query prefix.
    pub searches: Vec<(String, Vec<GhIssue>)>,
    pub commit_search: Vec<GhCommit>,
    /// Every search answers with 403, as when the search rate limit is used up.
    pub search_rate_limited: bool,
    pub languages: HashMap<String, BTreeMap<String, u64>>,
}

impl FakeClient {
    fn check(&self, repo_id: &RepositoryId) -> ClientResult<String> {
        let key = repo_id.to_string();
        if self.forbidden.contains(&key) {
            return Err(GitHubError::Forbidden);
        }
        Ok(key)
    }
}

fn state_matches(state: &str, wanted: ItemState) -> bool {
    wanted == ItemState::All || state == wanted.as_str()
}

fn page_of<T: Clone>(items: Vec<T>, page: PageRequest) -> Vec<T> {
    let start = (page.page.max(1) as usize - 1) * page.per_page as usize;
    items.into_iter().skip(start).take(page.per_page as usize).collect()
}

#[async_trait]
impl GitHubClient for FakeClient {
    async fn get_authenticated_user(&self) -> ClientResult<GhUser> {
        self.user.clone().ok_or(GitHubError::Unauthorized)
    }

    async fn get_user(&self, login: &str) -> ClientResult<GhUser> {
        self.user
            .clone()
            .filter(|x| x.login == login)
            .ok_or(GitHubError::NotFound)
    }

    async fn list_repositories(&self, affiliation: Affiliation) -> ClientResult<Vec<GhRepository>> {
        let login = self.user.as_ref().map(|x| x.login.as_str()).unwrap_or_default();
        let repos = self
            .repositories
            .iter()
            .filter(|x| match affiliation {
                Affiliation::All => true,
                Affiliation::Owner => x.owner.login == login,
                Affiliation::Member => x.owner.login != login,
            })
            .cloned()
            .collect();
        Ok(repos)
    }

    async fn get_repository(&self, repo_id: &RepositoryId) -> ClientResult<GhRepository> {
        let key = self.check(repo_id)?;
        self.repositories
            .iter()
            .find(|x| x.full_name == key)
            .cloned()
            .ok_or(GitHubError::NotFound)
    }

    async fn list_contributors(&self, repo_id: &RepositoryId) -> ClientResult<Vec<GhContributor>> {
        let key = self.check(repo_id)?;
        Ok(self.contributors.get(&key).cloned().unwrap_or_default())
    }

    async fn list_pull_requests(
        &self,
        repo_id: &RepositoryId,
        state: ItemState,
        page: PageRequest,
    ) -> ClientResult<Vec<GhPullRequest>> {
        let key = self.check(repo_id)?;
        let prs = self
            .pull_requests
            .get(&key)
            .into_iter()
            .flatten()
            .filter(|x| state_matches(&x.state, state))
            .cloned()
            .collect();
        Ok(page_of(prs, page))
    }

    async fn list_open_pull_requests(
        &self,
        repo_id: &RepositoryId,
    ) -> ClientResult<Vec<GhPullRequest>> {
        self.list_pull_requests(repo_id, ItemState::Open, PageRequest::first(u32::MAX))
            .await
    }

    async fn list_pull_request_reviews(
        &self,
        repo_id: &RepositoryId,
        number: u64,
    ) -> ClientResult<Vec<GhReview>> {
        let key = self.check(repo_id)?;
        Ok(self.reviews.get(&(key, number)).cloned().unwrap_or_default())
    }

    async fn list_issues(
        &self,
        repo_id: &RepositoryId,
        state: ItemState,
        page: PageRequest,
    ) -> ClientResult<Vec<GhIssue>> {
        let key = self.check(repo_id)?;
        let issues = self
            .issues
            .get(&key)
            .into_iter()
            .flatten()
            .filter(|x| state_matches(&x.state, state))
            .cloned()
            .collect();
        let issues = page_of(issues, page);
        Ok(issues.into_iter().filter(|x| !x.is_pull_request()).collect())
    }

    async fn list_open_issues(&self, repo_id: &RepositoryId) -> ClientResult<Vec<GhIssue>> {
        self.list_issues(repo_id, ItemState::Open, PageRequest::first(u32::MAX))
            .await
    }

    async fn list_issue_comments(
        &self,
        repo_id: &RepositoryId,
        number: u64,
    ) -> ClientResult<Vec<GhComment>> {
        let key = self.check(repo_id)?;
        Ok(self.issue_comments.get(&(key, number)).cloned().unwrap_or_default())
    }

    async fn list_pull_request_comments(
        &self,
        repo_id: &RepositoryId,
        number: u64,
    ) -> ClientResult<Vec<GhComment>> {
        let key = self.check(repo_id)?;
        Ok(self
            .pull_request_comments
            .get(&(key, number))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_commits(
        &self,
        repo_id: &RepositoryId,
        filter: &CommitFilter,
    ) -> ClientResult<Vec<GhCommit>> {
        let key = self.check(repo_id)?;
        let commits = self
            .commits
            .get(&key)
            .into_iter()
            .flatten()
            .filter(|x| match &filter.author {
                Some(author) => x.author.as_ref().map(|a| &a.login) == Some(author),
                None => true,
            })
            .filter(|x| filter.since.map(|t| x.commit.author.date >= t).unwrap_or(true))
            .filter(|x| filter.until.map(|t| x.commit.author.date <= t).unwrap_or(true))
            .cloned()
            .collect();
        Ok(commits)
    }

    async fn search_issues(&self, query: &str) -> ClientResult<GhSearchResults<GhIssue>> {
        if self.search_rate_limited {
            return Err(GitHubError::Forbidden);
        }
        let items = self
            .searches
            .iter()
            .find(|(prefix, _)| query.starts_with(prefix.as_str()))
            .map(|(_, items)| items.clone())
            .unwrap_or_default();
        Ok(GhSearchResults {
            total_count: items.len() as u64,
            incomplete_results: false,
            items,
        })
    }

    async fn search_commits(&self, _query: &str) -> ClientResult<GhSearchResults<GhCommit>> {
        if self.search_rate_limited {
            return Err(GitHubError::Forbidden);
        }
        Ok(GhSearchResults {
            total_count: self.commit_search.len() as u64,
            incomplete_results: false,
            items: self.commit_search.clone(),
        })
    }

    async fn get_languages(&self, repo_id: &RepositoryId) -> ClientResult<BTreeMap<String, u64>> {
        let key = self.check(repo_id)?;
        Ok(self.languages.get(&key).cloned().unwrap_or_default())
    }
}

// fixtures ------------------------------

pub fn actor(login: &str) -> GhActor {
    GhActor {
        login: login.to_owned(),
        id: 0,
        avatar_url: format!("https://avatars.example.com/{login}"),
    }
}

pub fn label(name: &str) -> GhLabel {
    GhLabel {
        id: 0,
        name: name.to_owned(),
        color: "ededed".to_owned(),
    }
}

pub fn user(login: &str, created_at: DateTime<Utc>) -> GhUser {
    GhUser {
        id: 1,
        login: login.to_owned(),
        name: Some("Mona Octocat".to_owned()),
        email: None,
        avatar_url: String::new(),
        bio: None,
        location: None,
        blog: None,
        twitter_username: None,
        public_repos: 3,
        followers: 10,
        following: 2,
        created_at,
        updated_at: None,
    }
}

pub fn repository(owner: &str, name: &str, updated_at: DateTime<Utc>) -> GhRepository {
    GhRepository {
        id: 1,
        name: name.to_owned(),
        full_name: format!("{owner}/{name}"),
        description: None,
        private: false,
        html_url: format!("https://github.com/{owner}/{name}"),
        language: Some("Rust".to_owned()),
        stargazers_count: 10,
        watchers_count: 10,
        forks_count: 2,
        open_issues_count: 0,
        created_at: updated_at,
        updated_at,
        pushed_at: Some(updated_at),
        default_branch: Some("main".to_owned()),
        archived: false,
        fork: false,
        topics: vec![],
        owner: actor(owner),
    }
}

pub fn pull_request(number: u64, author: &str, updated_at: DateTime<Utc>) -> GhPullRequest {
    GhPullRequest {
        id: number,
        number,
        title: format!("PR #{number}"),
        body: None,
        state: "open".to_owned(),
        html_url: String::new(),
        user: actor(author),
        created_at: updated_at,
        updated_at,
        closed_at: None,
        merged_at: None,
        draft: false,
        comments: 0,
        review_comments: 0,
        labels: vec![],
        assignees: vec![],
        requested_reviewers: vec![],
    }
}

pub fn issue(number: u64, author: &str, created_at: DateTime<Utc>) -> GhIssue {
    GhIssue {
        id: number,
        number,
        title: format!("Issue #{number}"),
        body: None,
        state: "open".to_owned(),
        html_url: String::new(),
        user: actor(author),
        created_at,
        updated_at: created_at,
        closed_at: None,
        comments: 0,
        labels: vec![],
        assignees: vec![],
        pull_request: None,
        repository_url: None,
    }
}

/// A search hit in `owner/name`.
pub fn hit(id: u64, repo: &str, author: &str, updated_at: DateTime<Utc>) -> GhIssue {
    let mut x = issue(id, author, updated_at);
    x.repository_url = Some(format!("https://api.github.com/repos/{repo}"));
    x
}

pub fn commit(author: &str, date: DateTime<Utc>) -> GhCommit {
    let actor_ = GhCommitActor {
        name: Some(author.to_owned()),
        email: None,
        date,
    };
    GhCommit {
        sha: format!("{:x}", date.timestamp()),
        commit: GhCommitDetail {
            author: actor_.clone(),
            committer: actor_,
            message: "Update".to_owned(),
        },
        author: Some(actor(author)),
        committer: Some(actor(author)),
        html_url: String::new(),
    }
}

pub fn comment(id: u64, author: &str, created_at: DateTime<Utc>) -> GhComment {
    GhComment {
        id,
        body: Some("LGTM".to_owned()),
        user: actor(author),
        created_at,
        updated_at: created_at,
        html_url: String::new(),
    }
}

pub fn review(author: &str, state: GhReviewState, submitted_at: DateTime<Utc>) -> GhReview {
    GhReview {
        id: submitted_at.timestamp() as u64,
        user: Some(actor(author)),
        body: None,
        state,
        html_url: String::new(),
        submitted_at: Some(submitted_at),
        commit_id: None,
    }
}

// end: fixtures ------------------------------
