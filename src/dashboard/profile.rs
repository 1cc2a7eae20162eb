use super::{analytics::recent_window, Dashboard};
use crate::{
    activity::{ActivityDay, ActivityTotals},
    database::Profile,
    github_client::{Affiliation, GitHubClient},
    github_models::*,
};
use anyhow::{Context, Error};
use chrono::{DateTime, Utc};
use futures::try_join;
use serde::Serialize;

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct MaintainerProfile {
    #[serde(flatten)]
    pub user: GhUser,
    pub repositories_count: usize,
    /// Owned by the maintainer and not archived.
    pub maintained_repositories: usize,
    pub settings: Option<Profile>,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct ActivityReport {
    pub user: GhUser,
    pub period: ReportPeriod,
    pub summary: ReportSummary,
    pub activity_data: Vec<ActivityDay>,
    pub repositories: Vec<ReportRepository>,
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct ReportPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct ReportSummary {
    pub total_repositories: usize,
    pub total_activity_days: usize,
    pub total_prs_reviewed: u32,
    pub total_issues_triaged: u32,
    pub total_comments_made: u32,
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct ReportRepository {
    pub name: String,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl From<&GhRepository> for ReportRepository {
    fn from(x: &GhRepository) -> Self {
        Self {
            name: x.name.clone(),
            stars: x.stargazers_count,
            forks: x.forks_count,
            language: x.language.clone(),
            last_updated: x.updated_at,
        }
    }
}

impl<C> Dashboard<C>
where
    C: GitHubClient,
{
    /// GitHub profile of the authenticated maintainer with their stored settings.
    #[tracing::instrument(skip(self, settings))]
    pub async fn profile(&self, settings: Option<Profile>) -> Result<MaintainerProfile, Error> {
        let (user, repos) = try_join!(
            self.client.get_authenticated_user(),
            self.client.list_repositories(Affiliation::All),
        )
        .context("Failed to get profile.")?;
        let maintained_repositories = repos
            .iter()
            .filter(|x| x.owner.login == user.login && !x.archived)
            .count();
        Ok(MaintainerProfile {
            user,
            repositories_count: repos.len(),
            maintained_repositories,
            settings,
        })
    }

    /// Last 30 days of activity over the maintainer's own repositories.
    #[tracing::instrument(skip(self))]
    pub async fn activity_report(&self) -> Result<ActivityReport, Error> {
        let end = Utc::now();
        let start = recent_window(end);
        let (activity_data, (user, repos)) = try_join!(self.activity_data(start), async {
            try_join!(
                self.client.get_user(&self.login),
                self.client.list_repositories(Affiliation::Owner),
            )
            .context("Failed to get maintainer.")
        })?;

        let totals = ActivityTotals::new(&activity_data);
        let summary = ReportSummary {
            total_repositories: repos.len(),
            total_activity_days: activity_data.len(),
            total_prs_reviewed: totals.prs,
            total_issues_triaged: totals.issues,
            total_comments_made: totals.comments,
        };
        Ok(ActivityReport {
            user,
            period: ReportPeriod { start, end },
            summary,
            activity_data,
            repositories: repos.iter().map(ReportRepository::from).collect(),
        })
    }
}
