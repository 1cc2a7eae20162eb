use super::{logins, paginate, skip_failed, Dashboard, LabelRef, Paginated, Unavailable};
use crate::{
    github_client::{Affiliation, GitHubClient, ItemState, PageRequest},
    github_models::*,
    RepositoryId,
};
use anyhow::{Context, Error};
use chrono::{DateTime, Utc};
use futures::try_join;
use serde::Serialize;
use std::{cmp::Reverse, collections::HashSet};
use tracing::warn;

/// Items inspected per repository when looking for comments.
const COMMENTED_ITEMS: usize = 5;

#[derive(PartialEq, Clone, Debug)]
pub struct HistoryQuery {
    pub state: ItemState,
    pub page: PageRequest,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            state: ItemState::All,
            page: PageRequest::first(30),
        }
    }
}

#[derive(Serialize, PartialEq, Eq, Copy, Clone, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Author,
    Reviewer,
    Assignee,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct HistoryItem {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub repository: String,
    pub owner: String,
    pub author: String,
    pub state: String,
    pub html_url: String,
    pub labels: Vec<LabelRef>,
    pub assignees: Vec<String>,
    pub comments: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Pull requests only.
    pub merged_at: Option<DateTime<Utc>>,
    pub your_role: Role,
}

impl HistoryItem {
    /// Returns `None` when the hit does not name its repository.
    fn new(hit: GhIssue, login: &str, other_role: Role) -> Option<Self> {
        let repo_id = match hit.repository_url.as_deref().map(RepositoryId::from_api_url) {
            Some(Ok(x)) => x,
            _ => {
                warn!(id = hit.id, "search hit without repository");
                return None;
            }
        };
        let your_role = if hit.user.login == login {
            Role::Author
        } else {
            other_role
        };
        Some(Self {
            labels: hit.labels.iter().map(LabelRef::from).collect(),
            assignees: logins(&hit.assignees),
            merged_at: hit.pull_request.and_then(|x| x.merged_at),
            repository: repo_id.name,
            owner: repo_id.owner,
            author: hit.user.login,
            id: hit.id,
            number: hit.number,
            title: hit.title,
            state: hit.state,
            html_url: hit.html_url,
            comments: hit.comments,
            created_at: hit.created_at,
            updated_at: hit.updated_at,
            closed_at: hit.closed_at,
            your_role,
        })
    }
}

#[derive(Serialize, PartialEq, Eq, Copy, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub enum CommentTarget {
    Issue,
    PullRequest,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct CommentActivity {
    #[serde(flatten)]
    pub comment: GhComment,
    pub r#type: CommentTarget,
    pub item_number: u64,
    pub item_title: String,
    pub repository: String,
    pub owner: String,
}

/// Joins search hits keeping the first occurrence of an id, newest first.
fn merge_hits(
    hits: impl IntoIterator<Item = GhIssue>,
    login: &str,
    other_role: Role,
    state: ItemState,
) -> Vec<HistoryItem> {
    let mut seen = HashSet::new();
    let mut items: Vec<_> = hits
        .into_iter()
        .filter(|x| seen.insert(x.id))
        .filter_map(|x| HistoryItem::new(x, login, other_role))
        .filter(|x| state == ItemState::All || x.state == state.as_str())
        .collect();
    items.sort_by_key(|x| Reverse(x.updated_at));
    items
}

impl<C> Dashboard<C>
where
    C: GitHubClient,
{
    /// Pull requests the maintainer was asked to review or authored.
    #[tracing::instrument(skip(self))]
    pub async fn pull_request_history(
        &self,
        query: &HistoryQuery,
    ) -> Result<Paginated<HistoryItem>, Error> {
        let login = self.login.as_str();
        let review_requested = format!("type:pr review-requested:{login}");
        let authored = format!("type:pr author:{login}");
        let (review_requested, authored) = try_join!(
            self.client.search_issues(&review_requested),
            self.client.search_issues(&authored),
        )
        .context("Failed to search pull request history.")?;

        let hits = review_requested.items.into_iter().chain(authored.items);
        let items = merge_hits(hits, login, Role::Reviewer, query.state);
        Ok(paginate(items, query.page))
    }

    /// Issues the maintainer authored or was assigned.
    #[tracing::instrument(skip(self))]
    pub async fn issue_history(&self, query: &HistoryQuery) -> Result<Paginated<HistoryItem>, Error> {
        let login = self.login.as_str();
        let authored = format!("type:issue author:{login}");
        let assigned = format!("type:issue assignee:{login}");
        let (authored, assigned) = try_join!(
            self.client.search_issues(&authored),
            self.client.search_issues(&assigned),
        )
        .context("Failed to search issue history.")?;

        let hits = authored.items.into_iter().chain(assigned.items);
        let items = merge_hits(hits, login, Role::Assignee, query.state);
        Ok(paginate(items, query.page))
    }

    /// The maintainer's comments on the latest issues and pull requests of their repositories.
    #[tracing::instrument(skip(self))]
    pub async fn comment_history(&self, page: PageRequest) -> Result<Paginated<CommentActivity>, Error> {
        let repos = self
            .client
            .list_repositories(Affiliation::All)
            .await
            .context("Failed to list repositories.")?;

        let per_repo = self
            .fan_out(
                repos.iter().take(self.options.recent_repository_limit),
                |repo| async move {
                    let repo_id = RepositoryId::from(repo);
                    Some(self.repository_comments(&repo_id).await)
                },
            )
            .await;

        let mut comments: Vec<_> = per_repo.into_iter().flatten().collect();
        comments.sort_by_key(|x| Reverse(x.comment.created_at));
        Ok(paginate(comments, page))
    }

    async fn repository_comments(&self, repo_id: &RepositoryId) -> Vec<CommentActivity> {
        let login = self.login.as_str();
        let result = try_join!(
            self.client.list_issues(repo_id, ItemState::All, PageRequest::first(20)),
            self.client
                .list_pull_requests(repo_id, ItemState::All, PageRequest::first(20)),
        );
        let (issues, prs) = match skip_failed(repo_id, result) {
            Some(x) => x,
            None => return vec![],
        };

        let targets = issues
            .into_iter()
            .take(COMMENTED_ITEMS)
            .map(|x| (CommentTarget::Issue, x.number, x.title))
            .chain(
                prs.into_iter()
                    .take(COMMENTED_ITEMS)
                    .map(|x| (CommentTarget::PullRequest, x.number, x.title)),
            );

        let per_item = self
            .fan_out(targets, |(target, number, title)| async move {
                let comments = match target {
                    CommentTarget::Issue => self.client.list_issue_comments(repo_id, number).await,
                    CommentTarget::PullRequest => {
                        self.client.list_pull_request_comments(repo_id, number).await
                    }
                };
                let comments = skip_failed(repo_id, comments)?
                    .into_iter()
                    .filter(|x| x.user.login == login)
                    .map(|comment| CommentActivity {
                        comment,
                        r#type: target,
                        item_number: number,
                        item_title: title.clone(),
                        repository: repo_id.name.clone(),
                        owner: repo_id.owner.clone(),
                    })
                    .collect::<Vec<_>>();
                Some(comments)
            })
            .await;
        per_item.into_iter().flatten().collect()
    }

    pub fn discussion_history(&self) -> Unavailable {
        Unavailable::discussions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{fake::*, DashboardOptions};
    use chrono::Duration;

    fn dashboard(client: FakeClient) -> Dashboard<FakeClient> {
        Dashboard::new(client, "mona", DashboardOptions::default())
    }

    #[tokio::test]
    async fn test_pull_request_history_dedupes_and_assigns_roles() {
        let now = Utc::now();
        let mut merged = hit(2, "mona/dash", "mona", now - Duration::days(1));
        merged.state = "closed".to_owned();
        merged.pull_request = Some(GhPullRequestRef {
            merged_at: Some(now - Duration::days(1)),
        });
        let client = FakeClient {
            searches: vec![
                (
                    "type:pr review-requested:mona".to_owned(),
                    vec![
                        hit(1, "octo/dash", "hubot", now - Duration::days(3)),
                        hit(3, "octo/cli", "hubot", now),
                    ],
                ),
                (
                    "type:pr author:mona".to_owned(),
                    vec![merged, hit(3, "octo/cli", "hubot", now)],
                ),
            ],
            ..Default::default()
        };
        let dashboard = dashboard(client);

        let all = dashboard
            .pull_request_history(&HistoryQuery::default())
            .await
            .unwrap();
        let ids: Vec<_> = all.data.iter().map(|x| x.id).collect();
        assert_eq!(ids, [3, 2, 1]);
        assert_eq!(all.data[0].your_role, Role::Reviewer);
        assert_eq!(all.data[0].repository, "cli");
        assert_eq!(all.data[0].owner, "octo");
        assert_eq!(all.data[1].your_role, Role::Author);
        assert!(all.data[1].merged_at.is_some());

        let closed = dashboard
            .pull_request_history(&HistoryQuery {
                state: ItemState::Closed,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(closed.data.len(), 1);
        assert_eq!(closed.pagination.total, 1);
    }

    #[tokio::test]
    async fn test_issue_history_roles() {
        let now = Utc::now();
        let mut no_repository = issue(9, "hubot", now);
        no_repository.repository_url = None;
        let client = FakeClient {
            searches: vec![
                (
                    "type:issue author:mona".to_owned(),
                    vec![hit(1, "mona/dash", "mona", now)],
                ),
                (
                    "type:issue assignee:mona".to_owned(),
                    vec![hit(2, "octo/dash", "hubot", now), no_repository],
                ),
            ],
            ..Default::default()
        };

        let history = dashboard(client)
            .issue_history(&HistoryQuery::default())
            .await
            .unwrap();

        assert_eq!(history.data.len(), 2);
        let roles: Vec<_> = history.data.iter().map(|x| (x.id, x.your_role)).collect();
        assert!(roles.contains(&(1, Role::Author)));
        assert!(roles.contains(&(2, Role::Assignee)));
    }

    #[tokio::test]
    async fn test_comment_history() {
        let now = Utc::now();
        let mut client = FakeClient {
            repositories: vec![repository("mona", "dash", now), repository("octo", "locked", now)],
            ..Default::default()
        };
        client.forbidden.insert("octo/locked".to_owned());
        client
            .issues
            .insert("mona/dash".to_owned(), vec![issue(1, "hubot", now)]);
        client
            .pull_requests
            .insert("mona/dash".to_owned(), vec![pull_request(2, "hubot", now)]);
        client.issue_comments.insert(
            ("mona/dash".to_owned(), 1),
            vec![
                comment(10, "mona", now - Duration::hours(2)),
                comment(11, "hubot", now - Duration::hours(1)),
            ],
        );
        client.pull_request_comments.insert(
            ("mona/dash".to_owned(), 2),
            vec![comment(20, "mona", now - Duration::hours(1))],
        );

        let history = dashboard(client)
            .comment_history(PageRequest::default())
            .await
            .unwrap();

        let ids: Vec<_> = history.data.iter().map(|x| x.comment.id).collect();
        assert_eq!(ids, [20, 10]);
        assert_eq!(history.data[0].r#type, CommentTarget::PullRequest);
        assert_eq!(history.data[1].item_title, "Issue #1");
        assert_eq!(history.data[1].repository, "dash");
    }

    #[test]
    fn test_serialize_comment_activity_flattens_comment() {
        let now = Utc::now();
        let x = CommentActivity {
            comment: comment(10, "mona", now),
            r#type: CommentTarget::PullRequest,
            item_number: 2,
            item_title: "PR #2".to_owned(),
            repository: "dash".to_owned(),
            owner: "mona".to_owned(),
        };
        let json = serde_json::to_value(&x).unwrap();
        assert_eq!(json["id"], 10);
        assert_eq!(json["type"], "pull_request");
    }
}
