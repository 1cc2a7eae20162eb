use super::{analytics::recent_window, skip_failed, Dashboard};
use crate::{
    error::GitHubError,
    github_client::{Affiliation, CommitFilter, GitHubClient, ItemState, PageRequest},
    github_models::*,
    metrics::{self, ActivityLevel},
    RepositoryId,
};
use anyhow::{Context, Error};
use chrono::{DateTime, Duration, Utc};
use futures::{join, try_join};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize, PartialEq, Eq, Clone, Default, Debug)]
pub struct MaintainerActivity {
    /// Pull requests the maintainer reviewed.
    pub reviews: u64,
    pub merges: u64,
    pub issues_closed: u64,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct RepositoryHealth {
    pub repository: String,
    pub health_score: u8,
    pub open_issues: usize,
    pub open_prs: usize,
    /// Maintainer's commits in the last 30 days.
    pub recent_commits: usize,
    pub last_activity: DateTime<Utc>,
    pub maintainer_activity: MaintainerActivity,
}

#[derive(PartialEq, Clone, Default, Debug)]
pub struct RepositoryFilter {
    /// Case-insensitive substring of the name or description.
    pub search: Option<String>,
    /// Case-insensitive; `all` matches every language.
    pub language: Option<String>,
    pub affiliation: Affiliation,
}

impl RepositoryFilter {
    pub fn matches(&self, repo: &GhRepository) -> bool {
        let search = self.search.as_ref().map(|x| x.to_lowercase());
        let found = match &search {
            Some(x) => {
                repo.name.to_lowercase().contains(x)
                    || repo
                        .description
                        .as_ref()
                        .map(|d| d.to_lowercase().contains(x))
                        .unwrap_or_default()
            }
            None => true,
        };
        let language = match self.language.as_deref() {
            None | Some("all") => true,
            Some(x) => repo
                .language
                .as_ref()
                .map(|l| l.eq_ignore_ascii_case(x))
                .unwrap_or_default(),
        };
        found && language
    }
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct RepositorySummary {
    #[serde(flatten)]
    pub repository: GhRepository,
    pub contributors_count: usize,
    pub health_score: u8,
    pub your_contributions: MaintainerActivity,
    pub activity_level: ActivityLevel,
    pub last_activity: DateTime<Utc>,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct RepositoryDetails {
    #[serde(flatten)]
    pub summary: RepositorySummary,
    pub recent_commits_count: usize,
    pub recent_activity: RecentItems,
    pub statistics: RepositoryStatistics,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct RecentItems {
    pub commits: Vec<GhCommit>,
    pub issues: Vec<GhIssue>,
    pub pull_requests: Vec<GhPullRequest>,
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct RepositoryStatistics {
    pub open_issues: usize,
    pub open_prs: usize,
    /// As reported by GitHub, which counts pull requests too.
    pub total_issues: u64,
    pub contributors: usize,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
}

impl<C> Dashboard<C>
where
    C: GitHubClient,
{
    #[tracing::instrument(skip(self), fields(repository = %repo_id))]
    pub async fn repository_health(
        &self,
        repo_id: &RepositoryId,
    ) -> Result<RepositoryHealth, GitHubError> {
        let now = Utc::now();
        let since = recent_window(now);
        let filter = CommitFilter {
            author: Some(self.login.clone()),
            since: Some(since),
            until: None,
        };
        let inputs = async {
            try_join!(
                self.client.get_repository(repo_id),
                self.client.list_open_issues(repo_id),
                self.client.list_open_pull_requests(repo_id),
                self.client.list_commits(repo_id, &filter),
            )
        };
        let (inputs, maintainer_activity) =
            join!(inputs, self.maintainer_activity(repo_id, since));
        let (repo, issues, prs, commits) = inputs?;
        // search has its own rate limit
        let maintainer_activity = skip_failed(repo_id, maintainer_activity).unwrap_or_default();
        let days_since_update = metrics::days_since(repo.updated_at, now);
        Ok(RepositoryHealth {
            repository: repo_id.to_string(),
            health_score: metrics::health_score(
                issues.len(),
                prs.len(),
                days_since_update,
                commits.len(),
            ),
            open_issues: issues.len(),
            open_prs: prs.len(),
            recent_commits: commits.len(),
            last_activity: repo.updated_at,
            maintainer_activity,
        })
    }

    /// Reviews by the maintainer, merged pull requests and closed issues since `since`.
    async fn maintainer_activity(
        &self,
        repo_id: &RepositoryId,
        since: DateTime<Utc>,
    ) -> Result<MaintainerActivity, GitHubError> {
        let query = format!(
            "type:pr repo:{repo_id} reviewed-by:{login} updated:>={date}",
            login = self.login,
            date = since.format("%Y-%m-%d")
        );
        let (reviewed, closed_prs, closed_issues) = try_join!(
            self.client.search_issues(&query),
            self.client
                .list_pull_requests(repo_id, ItemState::Closed, PageRequest::first(100)),
            self.client
                .list_issues(repo_id, ItemState::Closed, PageRequest::first(100)),
        )?;
        let merges = closed_prs
            .iter()
            .filter(|x| x.merged_at.map(|t| t >= since).unwrap_or_default())
            .count();
        let issues_closed = closed_issues
            .iter()
            .filter(|x| x.closed_at.map(|t| t >= since).unwrap_or_default())
            .count();
        Ok(MaintainerActivity {
            reviews: reviewed.total_count,
            merges: merges as u64,
            issues_closed: issues_closed as u64,
        })
    }

    /// Summarizes one repository; failing lookups degrade to zeros.
    async fn summarize(&self, repo: GhRepository, now: DateTime<Utc>) -> RepositorySummary {
        let repo_id = RepositoryId::from(&repo);
        let result = try_join!(
            self.client.list_contributors(&repo_id),
            self.repository_health(&repo_id),
        );
        let (contributors_count, health_score, your_contributions) =
            match skip_failed(&repo_id, result) {
                Some((contributors, health)) => (
                    contributors.len(),
                    health.health_score,
                    health.maintainer_activity,
                ),
                None => (0, 0, MaintainerActivity::default()),
            };
        RepositorySummary {
            contributors_count,
            health_score,
            your_contributions,
            activity_level: metrics::activity_level(repo.updated_at, now),
            last_activity: repo.updated_at,
            repository: repo,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_repositories(
        &self,
        filter: &RepositoryFilter,
    ) -> Result<Vec<RepositorySummary>, Error> {
        let now = Utc::now();
        let repos = self
            .client
            .list_repositories(filter.affiliation)
            .await
            .context("Failed to list repositories.")?;
        let repos = repos.into_iter().filter(|x| filter.matches(x));
        let summaries = self
            .fan_out(repos, |repo| async move { Some(self.summarize(repo, now).await) })
            .await;
        Ok(summaries)
    }

    #[tracing::instrument(skip(self), fields(repository = %repo_id))]
    pub async fn repository_details(&self, repo_id: &RepositoryId) -> Result<RepositoryDetails, Error> {
        let now = Utc::now();
        let (repo, contributors, health) = try_join!(
            self.client.get_repository(repo_id),
            self.client.list_contributors(repo_id),
            self.repository_health(repo_id),
        )
        .with_context(|| format!("Failed to get repository {repo_id}."))?;

        let filter = CommitFilter {
            since: Some(now - Duration::days(7)),
            ..Default::default()
        };
        let (mut commits, mut issues, mut pull_requests) = try_join!(
            self.client.list_commits(repo_id, &filter),
            self.client.list_issues(repo_id, ItemState::All, PageRequest::first(10)),
            self.client
                .list_pull_requests(repo_id, ItemState::All, PageRequest::first(10)),
        )
        .with_context(|| format!("Failed to get recent activity of {repo_id}."))?;
        commits.truncate(5);
        issues.truncate(5);
        pull_requests.truncate(5);

        let statistics = RepositoryStatistics {
            open_issues: health.open_issues,
            open_prs: health.open_prs,
            total_issues: repo.open_issues_count,
            contributors: contributors.len(),
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            watchers: repo.watchers_count,
        };
        let summary = RepositorySummary {
            contributors_count: contributors.len(),
            health_score: health.health_score,
            your_contributions: health.maintainer_activity,
            activity_level: metrics::activity_level(repo.updated_at, now),
            last_activity: repo.updated_at,
            repository: repo,
        };
        Ok(RepositoryDetails {
            summary,
            recent_commits_count: health.recent_commits,
            recent_activity: RecentItems {
                commits,
                issues,
                pull_requests,
            },
            statistics,
        })
    }

    pub async fn contributors(&self, repo_id: &RepositoryId) -> Result<Vec<GhContributor>, Error> {
        self.client
            .list_contributors(repo_id)
            .await
            .with_context(|| format!("Failed to list contributors of {repo_id}."))
    }

    pub async fn languages(&self, repo_id: &RepositoryId) -> Result<BTreeMap<String, u64>, Error> {
        self.client
            .get_languages(repo_id)
            .await
            .with_context(|| format!("Failed to get languages of {repo_id}."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{fake::*, DashboardOptions};

    fn dashboard(client: FakeClient) -> Dashboard<FakeClient> {
        Dashboard::new(client, "mona", DashboardOptions::default())
    }

    #[test]
    fn test_repository_filter() {
        let now = Utc::now();
        let mut repo = repository("mona", "Dash", now);
        repo.description = Some("A maintainer DASHBOARD".to_owned());

        assert!(RepositoryFilter::default().matches(&repo));
        let by_name = RepositoryFilter {
            search: Some("das".to_owned()),
            ..Default::default()
        };
        assert!(by_name.matches(&repo));
        let by_description = RepositoryFilter {
            search: Some("maintainer".to_owned()),
            ..Default::default()
        };
        assert!(by_description.matches(&repo));
        let by_language = RepositoryFilter {
            language: Some("rust".to_owned()),
            ..Default::default()
        };
        assert!(by_language.matches(&repo));
        let all_languages = RepositoryFilter {
            language: Some("all".to_owned()),
            ..Default::default()
        };
        assert!(all_languages.matches(&repo));
        let other_language = RepositoryFilter {
            language: Some("go".to_owned()),
            ..Default::default()
        };
        assert!(!other_language.matches(&repo));
    }

    #[tokio::test]
    async fn test_repository_health() {
        let now = Utc::now();
        let mut client = FakeClient::default();
        client
            .repositories
            .push(repository("mona", "dash", now - Duration::days(45)));
        client.issues.insert(
            "mona/dash".to_owned(),
            (0..60)
                .map(|n| issue(n, "hubot", now))
                .chain(std::iter::once({
                    let mut pr = issue(99, "hubot", now);
                    pr.pull_request = Some(GhPullRequestRef { merged_at: None });
                    pr
                }))
                .chain(std::iter::once({
                    let mut closed = issue(100, "hubot", now - Duration::days(3));
                    closed.state = "closed".to_owned();
                    closed.closed_at = Some(now - Duration::days(1));
                    closed
                }))
                .collect(),
        );
        let mut merged = pull_request(5, "hubot", now);
        merged.state = "closed".to_owned();
        merged.merged_at = Some(now - Duration::days(2));
        client.pull_requests.insert(
            "mona/dash".to_owned(),
            vec![pull_request(4, "hubot", now), merged],
        );
        client.searches.push((
            "type:pr repo:mona/dash reviewed-by:mona".to_owned(),
            vec![hit(4, "mona/dash", "hubot", now)],
        ));

        let health = dashboard(client)
            .repository_health(&RepositoryId::new("mona", "dash"))
            .await
            .unwrap();

        assert_eq!(health.repository, "mona/dash");
        assert_eq!(health.open_issues, 60);
        assert_eq!(health.open_prs, 1);
        assert_eq!(health.recent_commits, 0);
        // -20 backlog, -30 stale, -25 no commits
        assert_eq!(health.health_score, 25);
        assert_eq!(
            health.maintainer_activity,
            MaintainerActivity {
                reviews: 1,
                merges: 1,
                issues_closed: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_health_survives_search_rate_limit() {
        let now = Utc::now();
        let mut client = FakeClient {
            repositories: vec![repository("mona", "dash", now)],
            search_rate_limited: true,
            ..Default::default()
        };
        client.commits.insert("mona/dash".to_owned(), vec![commit("mona", now)]);
        client.contributors.insert(
            "mona/dash".to_owned(),
            vec![GhContributor {
                login: Some("mona".to_owned()),
                id: Some(1),
                avatar_url: None,
                contributions: 3,
                r#type: "User".to_owned(),
            }],
        );
        let dashboard = dashboard(client);

        let health = dashboard
            .repository_health(&RepositoryId::new("mona", "dash"))
            .await
            .unwrap();
        assert_eq!(health.health_score, 100);
        assert_eq!(health.recent_commits, 1);
        assert_eq!(health.maintainer_activity, MaintainerActivity::default());

        let repos = dashboard
            .list_repositories(&RepositoryFilter::default())
            .await
            .unwrap();
        assert_eq!(repos[0].health_score, 100);
        assert_eq!(repos[0].contributors_count, 1);
    }

    #[tokio::test]
    async fn test_list_repositories_defaults_failed_enrichment() {
        let now = Utc::now();
        let mut client = FakeClient {
            user: Some(user("mona", now)),
            repositories: vec![
                repository("mona", "dash", now),
                repository("mona", "locked", now - Duration::days(10)),
                repository("mona", "cli", now),
            ],
            ..Default::default()
        };
        client.forbidden.insert("mona/locked".to_owned());
        client.commits.insert("mona/dash".to_owned(), vec![commit("mona", now)]);
        client.contributors.insert(
            "mona/dash".to_owned(),
            vec![GhContributor {
                login: Some("mona".to_owned()),
                id: Some(1),
                avatar_url: None,
                contributions: 12,
                r#type: "User".to_owned(),
            }],
        );

        let filter = RepositoryFilter {
            search: Some("d".to_owned()),
            ..Default::default()
        };
        let repos = dashboard(client).list_repositories(&filter).await.unwrap();

        let names: Vec<_> = repos.iter().map(|x| x.repository.name.as_str()).collect();
        assert_eq!(names, ["dash", "locked"]);
        assert_eq!(repos[0].contributors_count, 1);
        assert_eq!(repos[0].health_score, 100);
        assert_eq!(repos[0].activity_level, ActivityLevel::High);
        assert_eq!(repos[1].health_score, 0);
        assert_eq!(repos[1].contributors_count, 0);
        assert_eq!(repos[1].activity_level, ActivityLevel::Medium);
    }

    #[tokio::test]
    async fn test_repository_details() {
        let now = Utc::now();
        let mut client = FakeClient::default();
        let mut repo = repository("mona", "dash", now);
        repo.open_issues_count = 9;
        client.repositories.push(repo);
        client.commits.insert(
            "mona/dash".to_owned(),
            (1..=8).map(|n| commit("hubot", now - Duration::hours(n))).collect(),
        );
        client.issues.insert(
            "mona/dash".to_owned(),
            (1..=7).map(|n| issue(n, "hubot", now)).collect(),
        );

        let details = dashboard(client)
            .repository_details(&RepositoryId::new("mona", "dash"))
            .await
            .unwrap();

        assert_eq!(details.recent_activity.commits.len(), 5);
        assert_eq!(details.recent_activity.issues.len(), 5);
        assert_eq!(details.statistics.open_issues, 7);
        assert_eq!(details.statistics.total_issues, 9);
        assert_eq!(details.recent_commits_count, 0);
        assert_eq!(details.summary.health_score, 75);
    }

    #[tokio::test]
    async fn test_repository_details_not_found() {
        let err = dashboard(FakeClient::default())
            .repository_details(&RepositoryId::new("mona", "nope"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to get repository mona/nope.");
        assert!(matches!(
            err.downcast_ref::<GitHubError>(),
            Some(GitHubError::NotFound)
        ));
    }
}
