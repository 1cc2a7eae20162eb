use super::{skip_failed, Dashboard, RepositoryHealth};
use crate::{
    activity::{self, *},
    github_client::{Affiliation, CommitFilter, GitHubClient, ItemState, PageRequest},
    github_models::*,
    metrics::{self, Period, TimeRange},
    RepositoryId,
};
use anyhow::{Context, Error};
use chrono::{DateTime, Duration, Utc};
use futures::try_join;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct Overview {
    pub time_range: TimeRange,
    pub metrics: ActivityTotals,
    pub activity_data: Vec<ActivityDay>,
    pub recent_activity: Vec<RecentActivity>,
    pub summary: RepositoriesSummary,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct RecentActivity {
    pub repository: String,
    pub owner: String,
    pub commits: Vec<GhCommit>,
    pub issues: Vec<GhIssue>,
    pub pull_requests: Vec<GhPullRequest>,
}

#[derive(Serialize, PartialEq, Eq, Clone, Default, Debug)]
pub struct RepositoriesSummary {
    pub total_repositories: usize,
    /// Updated within the last 30 days.
    pub active_repositories: usize,
    pub total_stars: u64,
    pub total_forks: u64,
}

impl RepositoriesSummary {
    pub fn new(repos: &[GhRepository], now: DateTime<Utc>) -> Self {
        Self {
            total_repositories: repos.len(),
            active_repositories: repos
                .iter()
                .filter(|x| metrics::days_since(x.updated_at, now) <= 30)
                .count(),
            total_stars: repos.iter().map(|x| x.stargazers_count).sum(),
            total_forks: repos.iter().map(|x| x.forks_count).sum(),
        }
    }
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct DetailedAnalytics {
    pub period: Period,
    pub activity_trends: Vec<MonthlyActivity>,
    pub sentiment_data: Vec<SentimentDay>,
    pub response_time_data: Vec<ResponseTimeWeek>,
    pub repository_health: Vec<RepositoryHealth>,
    pub summary_cards: SummaryCards,
    pub impact_metrics: ImpactMetrics,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct SummaryCards {
    pub total_contributions: u32,
    pub avg_response_time_hours: f64,
    /// Percentage of the maintainer's reviews that approved.
    pub approval_rate: f64,
}

#[derive(Serialize, PartialEq, Eq, Clone, Default, Debug)]
pub struct ImpactMetrics {
    pub reviews: u64,
    pub issues_closed: u64,
    pub prs_merged: u64,
}

impl ImpactMetrics {
    fn new(health: &[RepositoryHealth]) -> Self {
        health.iter().fold(Self::default(), |mut acc, x| {
            acc.reviews += x.maintainer_activity.reviews;
            acc.issues_closed += x.maintainer_activity.issues_closed;
            acc.prs_merged += x.maintainer_activity.merges;
            acc
        })
    }
}

/// Review-derived series of the detailed analytics.
#[derive(PartialEq, Clone, Default, Debug)]
struct ReviewInsights {
    sentiment: Vec<SentimentDay>,
    response_times: Vec<ResponseTimeWeek>,
}

impl<C> Dashboard<C>
where
    C: GitHubClient,
{
    /// Daily activity of the maintainer since `since`.
    #[tracing::instrument(skip(self))]
    pub async fn activity_data(&self, since: DateTime<Utc>) -> Result<Vec<ActivityDay>, Error> {
        let login = &self.login;
        let date = since.format("%Y-%m-%d");

        let review_requested = format!("type:pr review-requested:{login} updated:>={date}");
        let authored_issues = format!("type:issue author:{login} updated:>={date}");
        let commented = format!("commenter:{login} updated:>={date}");
        let (review_requested, authored_issues, commented) = try_join!(
            self.client.search_issues(&review_requested),
            self.client.search_issues(&authored_issues),
            self.client.search_issues(&commented),
        )
        .context("Failed to search activity.")?;

        // commit search is not available on every server
        let commits = format!("author:{login} committer-date:>={date}");
        let commits = match self.client.search_commits(&commits).await {
            Ok(x) => x.items,
            Err(err) => {
                warn!(error = %err, "ignoring commit activity");
                vec![]
            }
        };

        let days = activity::bucket_activity(
            &ActivitySources {
                review_requested: &review_requested.items,
                authored_issues: &authored_issues.items,
                commented: &commented.items,
                commits: &commits,
            },
            since,
        );
        debug!(days = days.len(), "bucketed activity");
        Ok(days)
    }

    #[tracing::instrument(skip(self))]
    pub async fn overview(&self, time_range: TimeRange) -> Result<Overview, Error> {
        let now = Utc::now();
        let since = time_range.since(now);

        let (activity_data, repos) = try_join!(self.activity_data(since), async {
            self.client
                .list_repositories(Affiliation::All)
                .await
                .context("Failed to list repositories.")
        })?;

        let login = self.login.as_str();
        let recent_activity = self
            .fan_out(
                repos.iter().take(self.options.recent_repository_limit),
                |repo| async move {
                    let repo_id = RepositoryId::from(repo);
                    let filter = CommitFilter {
                        author: Some(login.to_owned()),
                        since: Some(since),
                        until: None,
                    };
                    let result = try_join!(
                        self.client.list_commits(&repo_id, &filter),
                        self.client.list_issues(&repo_id, ItemState::All, PageRequest::first(5)),
                        self.client.list_pull_requests(
                            &repo_id,
                            ItemState::All,
                            PageRequest::first(5)
                        ),
                    );
                    let (mut commits, mut issues, mut pull_requests) =
                        skip_failed(&repo_id, result)?;
                    commits.truncate(3);
                    issues.truncate(3);
                    pull_requests.truncate(3);
                    Some(RecentActivity {
                        repository: repo_id.name,
                        owner: repo_id.owner,
                        commits,
                        issues,
                        pull_requests,
                    })
                },
            )
            .await;

        Ok(Overview {
            time_range,
            metrics: ActivityTotals::new(&activity_data),
            activity_data,
            recent_activity,
            summary: RepositoriesSummary::new(&repos, now),
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn detailed_analytics(&self, period: Period) -> Result<DetailedAnalytics, Error> {
        let now = Utc::now();
        let since = period.since(now);

        let (activity_data, insights, repos) = try_join!(
            self.activity_data(since),
            self.review_insights(since),
            async {
                self.client
                    .list_repositories(Affiliation::All)
                    .await
                    .context("Failed to list repositories.")
            }
        )?;

        let repository_health = self
            .fan_out(
                repos.iter().take(self.options.repository_limit),
                |repo| async move {
                    let repo_id = RepositoryId::from(repo);
                    let health = self.repository_health(&repo_id).await;
                    skip_failed(&repo_id, health)
                },
            )
            .await;

        let totals = ActivityTotals::new(&activity_data);
        let summary_cards = SummaryCards {
            total_contributions: totals.contributions(),
            avg_response_time_hours: activity::average_response_time(&insights.response_times),
            approval_rate: activity::approval_rate(&insights.sentiment),
        };

        Ok(DetailedAnalytics {
            period,
            activity_trends: activity::group_by_month(&activity_data),
            sentiment_data: insights.sentiment,
            response_time_data: insights.response_times,
            impact_metrics: ImpactMetrics::new(&repository_health),
            repository_health,
            summary_cards,
        })
    }

    /// Samples pull requests the maintainer reviewed and reads their own reviews.
    async fn review_insights(&self, since: DateTime<Utc>) -> Result<ReviewInsights, Error> {
        let login = self.login.as_str();
        let query = format!(
            "type:pr reviewed-by:{login} updated:>={}",
            since.format("%Y-%m-%d")
        );
        let reviewed = self
            .client
            .search_issues(&query)
            .await
            .context("Failed to search reviewed pull requests.")?;

        let sampled = reviewed.items.iter().take(self.options.review_sample);
        let per_pull_request = self
            .fan_out(sampled, |pr| async move {
                let repo_id = pr
                    .repository_url
                    .as_deref()
                    .and_then(|x| RepositoryId::from_api_url(x).ok())?;
                let reviews = self
                    .client
                    .list_pull_request_reviews(&repo_id, pr.number)
                    .await;
                let reviews: Vec<_> = skip_failed(&repo_id, reviews)?
                    .into_iter()
                    .filter(|x| x.submitted_at.map(|t| t >= since).unwrap_or_default())
                    .collect();
                Some((pr.created_at, reviews))
            })
            .await;

        let sentiment =
            activity::bucket_sentiment(per_pull_request.iter().flat_map(|(_, x)| x), login);
        let response_times = activity::bucket_response_times(
            per_pull_request
                .iter()
                .filter_map(|(created_at, reviews)| {
                    first_review_at(reviews, login).map(|x| (*created_at, x))
                }),
        );
        Ok(ReviewInsights {
            sentiment,
            response_times,
        })
    }
}

fn first_review_at(reviews: &[GhReview], login: &str) -> Option<DateTime<Utc>> {
    reviews
        .iter()
        .filter(|x| x.user.as_ref().map(|u| u.login == login).unwrap_or_default())
        .filter_map(|x| x.submitted_at)
        .min()
}

/// Start of the maintainer-activity window used by health scores.
pub(super) fn recent_window(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(30)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{fake::*, DashboardOptions};

    fn dashboard(client: FakeClient) -> Dashboard<FakeClient> {
        Dashboard::new(client, "mona", DashboardOptions::default())
    }

    #[tokio::test]
    async fn test_activity_data_buckets_searches() {
        let now = Utc::now();
        let client = FakeClient {
            searches: vec![
                (
                    "type:pr review-requested:mona".to_owned(),
                    vec![
                        hit(1, "octo/dash", "hubot", now),
                        hit(2, "octo/dash", "hubot", now - Duration::days(60)),
                    ],
                ),
                (
                    "type:issue author:mona".to_owned(),
                    vec![hit(3, "octo/dash", "mona", now)],
                ),
            ],
            commit_search: vec![commit("mona", now)],
            ..Default::default()
        };
        let days = dashboard(client)
            .activity_data(now - Duration::days(30))
            .await
            .unwrap();

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, now.date_naive());
        assert_eq!(days[0].prs_reviewed, 1);
        assert_eq!(days[0].issues_triaged, 1);
        assert_eq!(days[0].commits_made, 1);
        assert_eq!(days[0].comments_made, 0);
    }

    #[tokio::test]
    async fn test_overview_skips_inaccessible_repositories() {
        let now = Utc::now();
        let mut client = FakeClient {
            user: Some(user("mona", now)),
            repositories: vec![
                repository("mona", "dash", now),
                repository("octo", "secret", now - Duration::days(40)),
            ],
            ..Default::default()
        };
        client.forbidden.insert("octo/secret".to_owned());
        client.commits.insert(
            "mona/dash".to_owned(),
            vec![
                commit("mona", now - Duration::hours(1)),
                commit("mona", now - Duration::hours(2)),
                commit("mona", now - Duration::hours(3)),
                commit("mona", now - Duration::hours(4)),
                commit("hubot", now),
            ],
        );

        let overview = dashboard(client).overview(TimeRange::Week).await.unwrap();

        assert_eq!(overview.recent_activity.len(), 1);
        assert_eq!(overview.recent_activity[0].repository, "dash");
        assert_eq!(overview.recent_activity[0].commits.len(), 3);
        assert_eq!(
            overview.summary,
            RepositoriesSummary {
                total_repositories: 2,
                active_repositories: 1,
                total_stars: 20,
                total_forks: 4,
            }
        );
    }

    #[tokio::test]
    async fn test_detailed_analytics_reads_own_reviews() {
        let now = Utc::now();
        let mut reviewed = hit(7, "octo/dash", "hubot", now);
        reviewed.created_at = now - Duration::hours(10);
        let mut client = FakeClient {
            user: Some(user("mona", now)),
            searches: vec![("type:pr reviewed-by:mona".to_owned(), vec![reviewed])],
            ..Default::default()
        };
        client.reviews.insert(
            ("octo/dash".to_owned(), 7),
            vec![
                review("mona", GhReviewState::ChangesRequested, now - Duration::hours(6)),
                review("mona", GhReviewState::Approved, now - Duration::hours(1)),
                review("hubot", GhReviewState::Commented, now - Duration::hours(8)),
            ],
        );

        let analytics = dashboard(client)
            .detailed_analytics(Period::OneMonth)
            .await
            .unwrap();

        let reviews: u32 = analytics
            .sentiment_data
            .iter()
            .map(|x| x.approved + x.changes_requested + x.commented)
            .sum();
        assert_eq!(reviews, 2);
        assert_eq!(analytics.summary_cards.approval_rate, 50.0);
        assert_eq!(analytics.response_time_data.len(), 1);
        assert_eq!(analytics.response_time_data[0].avg_response_time_hours, 4.0);
        assert!(analytics.repository_health.is_empty());
    }
}
