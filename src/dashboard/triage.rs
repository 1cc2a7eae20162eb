use super::{
    logins, paginate, skip_failed, Author, Dashboard, LabelRef, Paginated, RepositoryRef,
    Unavailable,
};
use crate::{
    github_client::{Affiliation, GitHubClient, ItemState, PageRequest},
    github_models::*,
    metrics::{self, IssueStatus, Priority, PullRequestStatus},
    RepositoryId,
};
use anyhow::{Context, Error};
use chrono::{DateTime, Utc};
use futures::try_join;
use serde::Serialize;
use std::cmp::Reverse;

const PER_REPOSITORY: u32 = 50;
const STATS_PER_REPOSITORY: u32 = 100;

#[derive(Serialize, PartialEq, Eq, Clone, Default, Debug)]
pub struct TriageStats {
    /// Open pull requests authored by someone else.
    pub pending_reviews: usize,
    /// Open issues created within a week with nobody assigned.
    pub open_issues: usize,
    pub discussions_needing_response: usize,
    pub priority_items: usize,
    pub this_week_activity: usize,
}

#[derive(PartialEq, Clone, Debug)]
pub struct TriageQuery<S> {
    /// Repository name, every repository when absent.
    pub repository: Option<String>,
    pub status: Option<S>,
    pub priority: Option<Priority>,
    pub page: PageRequest,
}

impl<S> Default for TriageQuery<S> {
    fn default() -> Self {
        Self {
            repository: None,
            status: None,
            priority: None,
            page: PageRequest::first(20),
        }
    }
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct TriagePullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    pub repository: RepositoryRef,
    pub author: Author,
    pub status: PullRequestStatus,
    pub priority: Priority,
    pub labels: Vec<LabelRef>,
    pub requested_reviewers: Vec<String>,
    pub assignees: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TriagePullRequest {
    fn new(repo_id: &RepositoryId, pr: GhPullRequest) -> Self {
        Self {
            status: metrics::pull_request_status(&pr),
            priority: metrics::priority(&pr.labels),
            repository: repo_id.into(),
            author: (&pr.user).into(),
            labels: pr.labels.iter().map(LabelRef::from).collect(),
            requested_reviewers: logins(&pr.requested_reviewers),
            assignees: logins(&pr.assignees),
            id: pr.id,
            number: pr.number,
            title: pr.title,
            state: pr.state,
            html_url: pr.html_url,
            created_at: pr.created_at,
            updated_at: pr.updated_at,
        }
    }
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct TriageIssue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    pub repository: RepositoryRef,
    pub author: Author,
    pub status: IssueStatus,
    pub priority: Priority,
    pub labels: Vec<LabelRef>,
    pub comments: u64,
    pub assignees: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TriageIssue {
    fn new(repo_id: &RepositoryId, issue: GhIssue, now: DateTime<Utc>) -> Self {
        Self {
            status: metrics::issue_status(&issue, now),
            priority: metrics::priority(&issue.labels),
            repository: repo_id.into(),
            author: (&issue.user).into(),
            labels: issue.labels.iter().map(LabelRef::from).collect(),
            assignees: logins(&issue.assignees),
            id: issue.id,
            number: issue.number,
            title: issue.title,
            state: issue.state,
            html_url: issue.html_url,
            comments: issue.comments,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

/// Highest priority first, then most recently updated.
fn sort_for_triage<T>(items: &mut [T], key: impl Fn(&T) -> (Priority, DateTime<Utc>)) {
    items.sort_by_key(|x| Reverse(key(x)));
}

impl<C> Dashboard<C>
where
    C: GitHubClient,
{
    /// Repositories the triage queue visits, optionally narrowed to one name.
    async fn triage_repositories(&self, name: Option<&str>) -> Result<Vec<RepositoryId>, Error> {
        let repos = self
            .client
            .list_repositories(Affiliation::All)
            .await
            .context("Failed to list repositories.")?;
        let repos = repos
            .iter()
            .filter(|x| name.map(|n| x.name == n).unwrap_or(true))
            .take(self.options.repository_limit)
            .map(RepositoryId::from)
            .collect();
        Ok(repos)
    }

    #[tracing::instrument(skip(self))]
    pub async fn triage_stats(&self) -> Result<TriageStats, Error> {
        let now = Utc::now();
        let login = self.login.as_str();
        let repos = self.triage_repositories(None).await?;

        let per_repo = self
            .fan_out(repos, |repo_id| async move {
                let page = PageRequest::first(STATS_PER_REPOSITORY);
                let result = try_join!(
                    self.client.list_pull_requests(&repo_id, ItemState::Open, page),
                    self.client.list_issues(&repo_id, ItemState::Open, page),
                );
                let (prs, issues) = skip_failed(&repo_id, result)?;
                let pending_reviews = prs.iter().filter(|x| x.user.login != login).count();
                let open_issues = issues
                    .iter()
                    .filter(|x| metrics::needs_triage(x, now))
                    .count();
                let priority_items = prs
                    .iter()
                    .map(|x| x.labels.as_slice())
                    .chain(issues.iter().map(|x| x.labels.as_slice()))
                    .filter(|x| metrics::is_priority_item(x))
                    .count();
                Some(TriageStats {
                    pending_reviews,
                    open_issues,
                    priority_items,
                    ..Default::default()
                })
            })
            .await;

        let mut stats = per_repo.into_iter().fold(TriageStats::default(), |mut acc, x| {
            acc.pending_reviews += x.pending_reviews;
            acc.open_issues += x.open_issues;
            acc.priority_items += x.priority_items;
            acc
        });
        stats.this_week_activity =
            stats.pending_reviews + stats.open_issues + stats.discussions_needing_response;
        Ok(stats)
    }

    #[tracing::instrument(skip(self))]
    pub async fn triage_pull_requests(
        &self,
        query: &TriageQuery<PullRequestStatus>,
    ) -> Result<Paginated<TriagePullRequest>, Error> {
        let login = self.login.as_str();
        let repos = self.triage_repositories(query.repository.as_deref()).await?;

        let per_repo = self
            .fan_out(repos, |repo_id| async move {
                let prs = self
                    .client
                    .list_pull_requests(&repo_id, ItemState::Open, PageRequest::first(PER_REPOSITORY))
                    .await;
                let prs = skip_failed(&repo_id, prs)?
                    .into_iter()
                    .filter(|x| x.user.login != login)
                    .map(|x| TriagePullRequest::new(&repo_id, x))
                    .collect::<Vec<_>>();
                Some(prs)
            })
            .await;

        let mut prs: Vec<_> = per_repo
            .into_iter()
            .flatten()
            .filter(|x| query.status.map(|s| x.status == s).unwrap_or(true))
            .filter(|x| query.priority.map(|p| x.priority == p).unwrap_or(true))
            .collect();
        sort_for_triage(&mut prs, |x| (x.priority, x.updated_at));
        Ok(paginate(prs, query.page))
    }

    #[tracing::instrument(skip(self))]
    pub async fn triage_issues(
        &self,
        query: &TriageQuery<IssueStatus>,
    ) -> Result<Paginated<TriageIssue>, Error> {
        let now = Utc::now();
        let repos = self.triage_repositories(query.repository.as_deref()).await?;

        let per_repo = self
            .fan_out(repos, |repo_id| async move {
                let issues = self
                    .client
                    .list_issues(&repo_id, ItemState::Open, PageRequest::first(PER_REPOSITORY))
                    .await;
                let issues = skip_failed(&repo_id, issues)?
                    .into_iter()
                    .map(|x| TriageIssue::new(&repo_id, x, now))
                    .collect::<Vec<_>>();
                Some(issues)
            })
            .await;

        let mut issues: Vec<_> = per_repo
            .into_iter()
            .flatten()
            .filter(|x| query.status.map(|s| x.status == s).unwrap_or(true))
            .filter(|x| query.priority.map(|p| x.priority == p).unwrap_or(true))
            .collect();
        sort_for_triage(&mut issues, |x| (x.priority, x.updated_at));
        Ok(paginate(issues, query.page))
    }

    pub fn triage_discussions(&self) -> Unavailable {
        Unavailable::discussions()
    }
}
