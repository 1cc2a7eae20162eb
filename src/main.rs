#![deny(rust_2018_idioms)]

use crate::cli::*;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Password};
use mdash::{
    print_json, print_text, share_links, AppConfig, ConfigFile, ConfigOverrides, Dashboard,
    Database, GitHubClient, GitHubClientImpl, HistoryQuery, PageRequest, ProfileUpdate, Render,
    RepositoryFilter, TriageQuery,
};
use sekret::Secret;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;

const NO_TOKEN: &str = "No GitHub token. Set `MDASH_TOKEN`, `token` in the config file, or run `mdash settings token-set`.";

fn output<T>(x: &T, json: bool) -> Result<()>
where
    T: Serialize + Render,
{
    if json {
        print_json(x)
    } else {
        print_text(x)
    }
}

impl From<Paging> for PageRequest {
    fn from(Paging { page, per_page }: Paging) -> Self {
        Self { page, per_page }
    }
}

/// Connects as the configured or stored maintainer.
async fn connect(config: &AppConfig, db: &Database) -> Result<Dashboard<GitHubClientImpl>> {
    let (token, username) = match &config.token {
        Some(token) => (token.clone(), config.username.clone()),
        None => {
            let login = match &config.username {
                Some(x) => x.clone(),
                None => db.stored_login()?.context(NO_TOKEN)?,
            };
            let token = db.get_access_token(&login)?.context(NO_TOKEN)?;
            (token, Some(login))
        }
    };

    let client = GitHubClientImpl::new(
        token.as_ref().map(|x| x.as_str()),
        config.api_url.as_ref(),
    )?;
    let login = match username {
        Some(x) => x,
        None => {
            let user = client
                .get_authenticated_user()
                .await
                .context("Failed to authenticate.")?;
            user.login
        }
    };
    debug!(%login, "connected");
    Ok(Dashboard::new(client, login, config.options))
}

async fn repos(
    dashboard: &Dashboard<GitHubClientImpl>,
    cmd: repos::Command,
    json: bool,
) -> Result<()> {
    let login = dashboard.login();
    match cmd {
        repos::Command::Ls {
            search,
            language,
            affiliation,
        } => {
            let filter = RepositoryFilter {
                search,
                language,
                affiliation,
            };
            output(&dashboard.list_repositories(&filter).await?, json)
        }
        repos::Command::Show { repo } => {
            let repo = repo.complete(login);
            output(&dashboard.repository_details(&repo).await?, json)
        }
        repos::Command::Health { repo } => {
            let repo = repo.complete(login);
            let health = dashboard
                .repository_health(&repo)
                .await
                .with_context(|| format!("Failed to get health of {repo}."))?;
            output(&health, json)
        }
        repos::Command::Contributors { repo } => {
            let repo = repo.complete(login);
            output(&dashboard.contributors(&repo).await?, json)
        }
        repos::Command::Languages { repo } => {
            let repo = repo.complete(login);
            output(&dashboard.languages(&repo).await?, json)
        }
    }
}

async fn triage(
    dashboard: &Dashboard<GitHubClientImpl>,
    cmd: triage::Command,
    json: bool,
) -> Result<()> {
    match cmd {
        triage::Command::Stats => output(&dashboard.triage_stats().await?, json),
        triage::Command::Prs {
            repo,
            status,
            priority,
            paging,
        } => {
            let query = TriageQuery {
                repository: repo,
                status,
                priority,
                page: paging.into(),
            };
            output(&dashboard.triage_pull_requests(&query).await?, json)
        }
        triage::Command::Issues {
            repo,
            status,
            priority,
            paging,
        } => {
            let query = TriageQuery {
                repository: repo,
                status,
                priority,
                page: paging.into(),
            };
            output(&dashboard.triage_issues(&query).await?, json)
        }
        triage::Command::Discussions => output(&dashboard.triage_discussions(), json),
    }
}

async fn history(
    dashboard: &Dashboard<GitHubClientImpl>,
    cmd: history::Command,
    json: bool,
) -> Result<()> {
    match cmd {
        history::Command::Prs { state, paging } => {
            let query = HistoryQuery {
                state,
                page: paging.into(),
            };
            output(&dashboard.pull_request_history(&query).await?, json)
        }
        history::Command::Issues { state, paging } => {
            let query = HistoryQuery {
                state,
                page: paging.into(),
            };
            output(&dashboard.issue_history(&query).await?, json)
        }
        history::Command::Comments { paging } => {
            output(&dashboard.comment_history(paging.into()).await?, json)
        }
        history::Command::Discussions => output(&dashboard.discussion_history(), json),
    }
}

async fn profile(
    config: &AppConfig,
    db: &Database,
    dashboard: &Dashboard<GitHubClientImpl>,
    cmd: profile::Command,
    json: bool,
) -> Result<()> {
    match cmd {
        profile::Command::Show => {
            let settings = db.get_profile(dashboard.login())?;
            output(&dashboard.profile(settings).await?, json)
        }
        profile::Command::Share => {
            let links = share_links(&config.frontend_url, dashboard.login());
            output(&links, json)
        }
    }
}

async fn settings(
    config: &AppConfig,
    db: &mut Database,
    cmd: settings::Command,
    json: bool,
) -> Result<()> {
    match cmd {
        settings::Command::TokenSet => {
            let token = Secret(Password::new().with_prompt("GitHub token").interact()?);
            let login = GitHubClientImpl::validate_token(
                token.as_ref().map(|x| x.as_str()),
                config.api_url.as_ref(),
            )
            .await
            .context("Failed to validate token.")?;
            db.set_access_token(&login, token.as_ref().map(|x| x.as_str()))?;
            info!(%login, "token stored");
            println!("Token stored for {login}.");
        }
        settings::Command::TokenClear { yes } => {
            let login = match &config.username {
                Some(x) => x.clone(),
                None => match db.stored_login()? {
                    Some(x) => x,
                    None => {
                        println!("No stored token.");
                        return Ok(());
                    }
                },
            };
            if !yes
                && !Confirm::new()
                    .with_prompt(format!("Forget the GitHub token of {login}?"))
                    .default(false)
                    .show_default(true)
                    .wait_for_newline(true)
                    .interact()?
            {
                return Ok(());
            }
            db.clear_access_token(&login)?;
            println!("Token cleared for {login}.");
        }
        settings::Command::Show => {
            let dashboard = connect(config, db).await?;
            match db.get_profile(dashboard.login())? {
                Some(x) => output(&x, json)?,
                None if json => print_json(&None::<()>)?,
                None => println!("No settings stored for {}.", dashboard.login()),
            }
        }
        settings::Command::Set {
            name,
            about,
            twitter,
            linkedin,
            mail,
            portfolio,
        } => {
            let dashboard = connect(config, db).await?;
            let update = ProfileUpdate {
                name,
                about,
                twitter,
                linkedin,
                mail,
                portfolio,
            };
            let profile = db.update_profile(dashboard.login(), &update)?;
            output(&profile, json)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Cli {
        json,
        config,
        username,
        token,
        cmd,
    } = cli();
    debug!(?cmd, "launched");

    // load config
    let config_path = match config {
        Some(x) => x,
        None => ConfigFile::default_path()?,
    };
    let file = ConfigFile::load(&config_path)?;
    let config = AppConfig::new(file, ConfigOverrides { username, token })?;
    let mut db = Database::new(&config.database)
        .with_context(|| format!("Failed to open database `{}`.", config.database.display()))?;

    // process command
    let cmd = match cmd {
        Command::Settings { cmd } => {
            settings(&config, &mut db, cmd, json).await?;
            debug!("exiting");
            return Ok(());
        }
        cmd => cmd,
    };

    let dashboard = connect(&config, &db).await?;
    match cmd {
        Command::Overview { range } => output(&dashboard.overview(range).await?, json)?,
        Command::Analytics { period } => {
            output(&dashboard.detailed_analytics(period).await?, json)?
        }
        Command::Repos { cmd } => repos(&dashboard, cmd, json).await?,
        Command::Triage { cmd } => triage(&dashboard, cmd, json).await?,
        Command::History { cmd } => history(&dashboard, cmd, json).await?,
        Command::Profile { cmd } => profile(&config, &db, &dashboard, cmd, json).await?,
        Command::Report => print_json(&dashboard.activity_report().await?)?,
        Command::Whoami => {
            let user = dashboard
                .client()
                .get_authenticated_user()
                .await
                .context("Failed to authenticate.")?;
            output(&user, json)?
        }
        Command::Settings { .. } => unreachable!("handled above"),
    };

    debug!("exiting");
    Ok(())
}
