//! Aggregates GitHub activity of a maintainer across repositories.

mod analytics;
mod history;
mod profile;
mod repositories;
mod triage;

#[cfg(test)]
pub(crate) mod fake;

pub use self::{analytics::*, history::*, profile::*, repositories::*, triage::*};

use crate::{
    error::GitHubError,
    github_client::{GitHubClient, PageRequest},
    github_models::{GhActor, GhLabel},
    RepositoryId,
};
use futures::{future, stream, Future, StreamExt};
use serde::Serialize;
use tracing::warn;

/// How wide aggregations fan out.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct DashboardOptions {
    /// Repositories visited by triage, analytics and health aggregations.
    pub repository_limit: usize,
    /// Repositories visited for recent activity and comment history.
    pub recent_repository_limit: usize,
    /// Reviewed pull requests sampled for review sentiment and response times.
    pub review_sample: usize,
    /// Requests in flight at once.
    pub concurrency: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            repository_limit: 10,
            recent_repository_limit: 5,
            review_sample: 20,
            concurrency: 4,
        }
    }
}

#[derive(Debug)]
pub struct Dashboard<C> {
    client: C,
    login: String,
    options: DashboardOptions,
}

impl<C> Dashboard<C>
where
    C: GitHubClient,
{
    pub fn new(client: C, login: impl Into<String>, options: DashboardOptions) -> Self {
        Self {
            client,
            login: login.into(),
            options,
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs `f` over `items` with bounded concurrency, keeping input order and dropping `None`s.
    async fn fan_out<T, R, F, Fut>(&self, items: impl IntoIterator<Item = T>, f: F) -> Vec<R>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Option<R>>,
    {
        stream::iter(items)
            .map(f)
            .buffered(self.options.concurrency.max(1))
            .filter_map(future::ready)
            .collect()
            .await
    }
}

/// Logs and swallows a failure of a single repository.
fn skip_failed<T>(repo_id: &RepositoryId, result: Result<T, GitHubError>) -> Option<T> {
    match result {
        Ok(x) => Some(x),
        Err(err) => {
            warn!(repository = %repo_id, error = %err, "skipping repository");
            None
        }
    }
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Slices out a 1-based page.
pub fn paginate<T>(items: Vec<T>, page: PageRequest) -> Paginated<T> {
    let page_num = page.page.max(1);
    let per_page = page.per_page.max(1);
    let total = items.len();
    let size = per_page as usize;
    let start = (page_num as usize - 1).saturating_mul(size);
    let data = items.into_iter().skip(start).take(size).collect();
    Paginated {
        data,
        pagination: Pagination {
            page: page_num,
            per_page,
            total,
            total_pages: (total + size - 1) / size,
        },
    }
}

/// Placeholder listing for data only the GraphQL API serves.
#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct Unavailable {
    pub data: Vec<serde_json::Value>,
    pub message: &'static str,
}

impl Unavailable {
    fn discussions() -> Self {
        Self {
            data: vec![],
            message: "Discussions are only served by the GraphQL API.",
        }
    }
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct RepositoryRef {
    pub name: String,
    pub owner: String,
}

impl From<&RepositoryId> for RepositoryRef {
    fn from(x: &RepositoryId) -> Self {
        Self {
            name: x.name.clone(),
            owner: x.owner.clone(),
        }
    }
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct Author {
    pub login: String,
    pub avatar_url: String,
}

impl From<&GhActor> for Author {
    fn from(x: &GhActor) -> Self {
        Self {
            login: x.login.clone(),
            avatar_url: x.avatar_url.clone(),
        }
    }
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct LabelRef {
    pub name: String,
    pub color: String,
}

impl From<&GhLabel> for LabelRef {
    fn from(x: &GhLabel) -> Self {
        Self {
            name: x.name.clone(),
            color: x.color.clone(),
        }
    }
}

fn logins(actors: &[GhActor]) -> Vec<String> {
    actors.iter().map(|x| x.login.clone()).collect()
}
