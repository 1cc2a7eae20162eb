use crate::{error::GitHubError, github_models::*, RepositoryId};
use async_stream::try_stream;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::{Future, Stream, TryStreamExt};
use http::header::HeaderName;
use octocrab::{FromResponse, Octocrab, Page};
use sekret::Secret;
use std::{collections::BTreeMap, fmt};
use tracing::debug;
use url::{form_urlencoded, Url};

type ClientResult<T> = Result<T, GitHubError>;

const USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    concat!("/", env!("CARGO_PKG_VERSION"))
);

/// Largest page size the REST API accepts.
const MAX_PER_PAGE: u32 = 100;

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum ItemState {
    Open,
    Closed,
    All,
}

impl ItemState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

impl std::str::FromStr for ItemState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let x = match s {
            "open" => Self::Open,
            "closed" => Self::Closed,
            "all" => Self::All,
            _ => anyhow::bail!("Expecting one of `open`, `closed`, `all`, but was `{}`.", s),
        };
        Ok(x)
    }
}

/// Which repositories of the authenticated user to list.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Affiliation {
    All,
    Owner,
    Member,
}

impl Affiliation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Owner => "owner",
            Self::Member => "member",
        }
    }
}

impl Default for Affiliation {
    fn default() -> Self {
        Self::All
    }
}

impl std::str::FromStr for Affiliation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let x = match s {
            "all" => Self::All,
            "owner" => Self::Owner,
            "member" => Self::Member,
            _ => anyhow::bail!("Expecting one of `all`, `owner`, `member`, but was `{}`.", s),
        };
        Ok(x)
    }
}

/// A single page of a listing, 1-based.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub const fn first(per_page: u32) -> Self {
        Self { page: 1, per_page }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(30)
    }
}

#[derive(PartialEq, Clone, Default, Debug)]
pub struct CommitFilter {
    pub author: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// Defines the queries the dashboard makes against a GitHub server.
#[async_trait]
pub trait GitHubClient: Send + Sync {
    /// https://docs.github.com/en/rest/users/users#get-the-authenticated-user
    async fn get_authenticated_user(&self) -> ClientResult<GhUser>;

    async fn get_user(&self, login: &str) -> ClientResult<GhUser>;

    /// https://docs.github.com/en/rest/repos/repos#list-repositories-for-the-authenticated-user
    async fn list_repositories(&self, affiliation: Affiliation) -> ClientResult<Vec<GhRepository>>;

    async fn get_repository(&self, repo_id: &RepositoryId) -> ClientResult<GhRepository>;

    async fn list_contributors(&self, repo_id: &RepositoryId) -> ClientResult<Vec<GhContributor>>;

    /// https://docs.github.com/en/rest/pulls/pulls#list-pull-requests
    async fn list_pull_requests(
        &self,
        repo_id: &RepositoryId,
        state: ItemState,
        page: PageRequest,
    ) -> ClientResult<Vec<GhPullRequest>>;

    /// Every open pull request, across all pages.
    async fn list_open_pull_requests(
        &self,
        repo_id: &RepositoryId,
    ) -> ClientResult<Vec<GhPullRequest>>;

    async fn list_pull_request_reviews(
        &self,
        repo_id: &RepositoryId,
        number: u64,
    ) -> ClientResult<Vec<GhReview>>;

    /// Issues of a repository, without the pull requests GitHub mixes in.
    async fn list_issues(
        &self,
        repo_id: &RepositoryId,
        state: ItemState,
        page: PageRequest,
    ) -> ClientResult<Vec<GhIssue>>;

    /// Every open issue, across all pages, without pull requests.
    async fn list_open_issues(&self, repo_id: &RepositoryId) -> ClientResult<Vec<GhIssue>>;

    async fn list_issue_comments(
        &self,
        repo_id: &RepositoryId,
        number: u64,
    ) -> ClientResult<Vec<GhComment>>;

    async fn list_pull_request_comments(
        &self,
        repo_id: &RepositoryId,
        number: u64,
    ) -> ClientResult<Vec<GhComment>>;

    /// https://docs.github.com/en/rest/commits/commits#list-commits
    async fn list_commits(
        &self,
        repo_id: &RepositoryId,
        filter: &CommitFilter,
    ) -> ClientResult<Vec<GhCommit>>;

    /// https://docs.github.com/en/rest/search#search-issues-and-pull-requests
    async fn search_issues(&self, query: &str) -> ClientResult<GhSearchResults<GhIssue>>;

    /// https://docs.github.com/en/rest/search#search-commits
    async fn search_commits(&self, query: &str) -> ClientResult<GhSearchResults<GhCommit>>;

    /// Bytes of code per language.
    async fn get_languages(&self, repo_id: &RepositoryId) -> ClientResult<BTreeMap<String, u64>>;
}

/// Newtype of Octocrab.
#[derive(Clone)]
pub struct GitHubClientImpl {
    client: Octocrab,
}

impl fmt::Debug for GitHubClientImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClientImpl").finish_non_exhaustive()
    }
}

impl GitHubClientImpl {
    pub fn new(token: Secret<&str>, base_url: Option<&Url>) -> ClientResult<Self> {
        let mut builder = Octocrab::builder()
            .add_header(
                HeaderName::from_static("user-agent"),
                USER_AGENT.to_string(),
            )
            .personal_token(token.into_inner().to_owned());
        if let Some(base_url) = base_url {
            builder = builder.base_url(base_url.clone())?;
        }
        let client = builder.build()?;
        Ok(Self { client })
    }

    /// Returns the login the token authenticates as.
    pub async fn validate_token(token: Secret<&str>, base_url: Option<&Url>) -> ClientResult<String> {
        let client = Self::new(token, base_url)?;
        let user = client.get_authenticated_user().await?;
        Ok(user.login)
    }

    async fn get<T>(&self, route: String) -> ClientResult<T>
    where
        T: FromResponse,
    {
        debug!(%route, "sending request");
        let response: T = self.client.get::<_, _, ()>(route, None).await?;
        Ok(response)
    }

    async fn list_all<T>(&self, path: &str, params: &[(&str, &str)]) -> ClientResult<Vec<T>>
    where
        T: serde::de::DeserializeOwned + Send + 'static,
    {
        unpage(|page_num| {
            let per_page = MAX_PER_PAGE.to_string();
            let page_num = page_num.to_string();
            let mut params = params.to_vec();
            params.push(("per_page", &per_page));
            params.push(("page", &page_num));
            let route = route(path, &params);
            async move { self.get::<Page<T>>(route).await }
        })
        .try_collect()
        .await
    }
}

#[async_trait]
impl GitHubClient for GitHubClientImpl {
    async fn get_authenticated_user(&self) -> ClientResult<GhUser> {
        self.get("user".to_owned()).await
    }

    async fn get_user(&self, login: &str) -> ClientResult<GhUser> {
        self.get(format!("users/{login}")).await
    }

    async fn list_repositories(&self, affiliation: Affiliation) -> ClientResult<Vec<GhRepository>> {
        self.list_all(
            "user/repos",
            &[("type", affiliation.as_str()), ("sort", "updated")],
        )
        .await
    }

    async fn get_repository(&self, repo_id: &RepositoryId) -> ClientResult<GhRepository> {
        let RepositoryId { owner, name } = repo_id;
        self.get(format!("repos/{owner}/{name}")).await
    }

    async fn list_contributors(&self, repo_id: &RepositoryId) -> ClientResult<Vec<GhContributor>> {
        let RepositoryId { owner, name } = repo_id;
        self.list_all(&format!("repos/{owner}/{name}/contributors"), &[])
            .await
    }

    async fn list_pull_requests(
        &self,
        repo_id: &RepositoryId,
        state: ItemState,
        page: PageRequest,
    ) -> ClientResult<Vec<GhPullRequest>> {
        let RepositoryId { owner, name } = repo_id;
        let page_num = page.page.to_string();
        let per_page = page.per_page.to_string();
        let route = route(
            &format!("repos/{owner}/{name}/pulls"),
            &[
                ("state", state.as_str()),
                ("page", &page_num),
                ("per_page", &per_page),
                ("sort", "updated"),
                ("direction", "desc"),
            ],
        );
        self.get(route).await
    }

    async fn list_open_pull_requests(
        &self,
        repo_id: &RepositoryId,
    ) -> ClientResult<Vec<GhPullRequest>> {
        let RepositoryId { owner, name } = repo_id;
        self.list_all(&format!("repos/{owner}/{name}/pulls"), &[("state", "open")])
            .await
    }

    async fn list_pull_request_reviews(
        &self,
        repo_id: &RepositoryId,
        number: u64,
    ) -> ClientResult<Vec<GhReview>> {
        let RepositoryId { owner, name } = repo_id;
        self.get(format!("repos/{owner}/{name}/pulls/{number}/reviews?per_page=100"))
            .await
    }

    async fn list_issues(
        &self,
        repo_id: &RepositoryId,
        state: ItemState,
        page: PageRequest,
    ) -> ClientResult<Vec<GhIssue>> {
        let RepositoryId { owner, name } = repo_id;
        let page_num = page.page.to_string();
        let per_page = page.per_page.to_string();
        let route = route(
            &format!("repos/{owner}/{name}/issues"),
            &[
                ("state", state.as_str()),
                ("page", &page_num),
                ("per_page", &per_page),
                ("sort", "updated"),
                ("direction", "desc"),
            ],
        );
        let issues: Vec<GhIssue> = self.get(route).await?;
        Ok(issues.into_iter().filter(|x| !x.is_pull_request()).collect())
    }

    async fn list_open_issues(&self, repo_id: &RepositoryId) -> ClientResult<Vec<GhIssue>> {
        let RepositoryId { owner, name } = repo_id;
        let issues: Vec<GhIssue> = self
            .list_all(&format!("repos/{owner}/{name}/issues"), &[("state", "open")])
            .await?;
        Ok(issues.into_iter().filter(|x| !x.is_pull_request()).collect())
    }

    async fn list_issue_comments(
        &self,
        repo_id: &RepositoryId,
        number: u64,
    ) -> ClientResult<Vec<GhComment>> {
        let RepositoryId { owner, name } = repo_id;
        self.get(format!("repos/{owner}/{name}/issues/{number}/comments?per_page=100"))
            .await
    }

    async fn list_pull_request_comments(
        &self,
        repo_id: &RepositoryId,
        number: u64,
    ) -> ClientResult<Vec<GhComment>> {
        let RepositoryId { owner, name } = repo_id;
        self.get(format!("repos/{owner}/{name}/pulls/{number}/comments?per_page=100"))
            .await
    }

    async fn list_commits(
        &self,
        repo_id: &RepositoryId,
        filter: &CommitFilter,
    ) -> ClientResult<Vec<GhCommit>> {
        let RepositoryId { owner, name } = repo_id;
        let since = filter.since.map(to_timestamp);
        let until = filter.until.map(to_timestamp);
        let mut params = vec![("per_page", "100")];
        if let Some(author) = &filter.author {
            params.push(("author", author.as_str()));
        }
        if let Some(since) = &since {
            params.push(("since", since.as_str()));
        }
        if let Some(until) = &until {
            params.push(("until", until.as_str()));
        }
        let route = route(&format!("repos/{owner}/{name}/commits"), &params);
        match self.get::<Vec<GhCommit>>(route).await {
            // empty repositories answer with 409
            Err(GitHubError::Api(message)) if message == "Git Repository is empty." => Ok(vec![]),
            x => x,
        }
    }

    async fn search_issues(&self, query: &str) -> ClientResult<GhSearchResults<GhIssue>> {
        let route = route(
            "search/issues",
            &[
                ("q", query),
                ("sort", "updated"),
                ("order", "desc"),
                ("per_page", "100"),
            ],
        );
        self.get(route).await
    }

    async fn search_commits(&self, query: &str) -> ClientResult<GhSearchResults<GhCommit>> {
        let route = route(
            "search/commits",
            &[
                ("q", query),
                ("sort", "committer-date"),
                ("order", "desc"),
                ("per_page", "100"),
            ],
        );
        self.get(route).await
    }

    async fn get_languages(&self, repo_id: &RepositoryId) -> ClientResult<BTreeMap<String, u64>> {
        let RepositoryId { owner, name } = repo_id;
        self.get(format!("repos/{owner}/{name}/languages")).await
    }
}

/// Creates a relative route with an url-encoded query string.
fn route(path: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return path.to_owned();
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{path}?{query}")
}

fn to_timestamp(x: DateTime<Utc>) -> String {
    x.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Walks pages, starting at 1, until the response has no next link.
fn unpage<'a, T, F, Fut>(factory: F) -> impl Stream<Item = ClientResult<T>> + 'a
where
    T: Send + 'static,
    F: Fn(u32) -> Fut + Send + 'a,
    Fut: Future<Output = ClientResult<Page<T>>> + Send + 'a,
{
    try_stream! {
        let mut page_num = 1;
        loop {
            let page = factory(page_num).await?;
            let has_next = page.next.is_some();
            for item in page {
                yield item;
            }
            if !has_next {
                break;
            }
            page_num += 1;
        }
    }
}
