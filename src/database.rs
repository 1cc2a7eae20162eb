use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use sekret::Secret;
use serde::Serialize;
use std::path::Path;
use tracing::info;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Sql for database migrations.
///
/// All operations must be idempotent.
const MIGRATIONS: &'static str = "
    CREATE TABLE IF NOT EXISTS profiles (
        login TEXT PRIMARY KEY NOT NULL,
        name TEXT NULL,
        about TEXT NULL,
        twitter TEXT NULL,
        linkedin TEXT NULL,
        mail TEXT NULL,
        portfolio TEXT NULL,
        access_token TEXT NULL,
        created_at TEXT NOT NULL
    );
";

const QR_CODE_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/?size=200x200&data=";

/// Characters JavaScript's `encodeURIComponent` escapes.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Maintainer's own profile fields, shown on the shareable profile.
#[derive(Serialize, Debug, PartialEq, Clone)]
pub struct Profile {
    pub login: String,
    pub name: Option<String>,
    pub about: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub mail: Option<String>,
    pub portfolio: Option<String>,
    pub has_github_token: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields to overwrite. Absent or empty fields keep their stored value.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub about: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub mail: Option<String>,
    pub portfolio: Option<String>,
}

#[derive(Serialize, Debug, PartialEq, Clone)]
pub struct ShareLinks {
    pub share_url: String,
    pub qr_code_url: String,
}

pub struct Database(rusqlite::Connection);

impl Database {
    #[tracing::instrument]
    pub fn new(path: &Path) -> Result<Self, anyhow::Error> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let conn = rusqlite::Connection::open(path)?;
        let db = Self(conn);
        migrate(&db)?;
        info!("database ready");
        Ok(db)
    }

    #[tracing::instrument(skip(self))]
    pub fn get_profile(&self, login: &str) -> Result<Option<Profile>, anyhow::Error> {
        get_profile(self, login)
    }

    #[tracing::instrument(skip(self))]
    pub fn update_profile(
        &mut self,
        login: &str,
        update: &ProfileUpdate,
    ) -> Result<Profile, anyhow::Error> {
        update_profile(self, login, update)
    }

    #[tracing::instrument(skip(self, token))]
    pub fn set_access_token(&mut self, login: &str, token: Secret<&str>) -> Result<(), anyhow::Error> {
        ensure_profile(self, login)?;
        self.0.execute(
            "UPDATE profiles SET access_token = ? WHERE login = ?;",
            params![token.into_inner(), login],
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_access_token(&mut self, login: &str) -> Result<(), anyhow::Error> {
        self.0.execute(
            "UPDATE profiles SET access_token = NULL WHERE login = ?;",
            [login],
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn get_access_token(&self, login: &str) -> Result<Option<Secret<String>>, anyhow::Error> {
        let token: Option<Option<String>> = self
            .0
            .query_row(
                "SELECT access_token FROM profiles WHERE login = ?;",
                [login],
                |x| x.get(0),
            )
            .optional()?;
        Ok(token.flatten().map(Secret))
    }

    #[tracing::instrument(skip(self))]
    pub fn has_access_token(&self, login: &str) -> Result<bool, anyhow::Error> {
        Ok(self.get_access_token(login)?.is_some())
    }

    /// Login of the earliest profile holding a token.
    #[tracing::instrument(skip(self))]
    pub fn stored_login(&self) -> Result<Option<String>, anyhow::Error> {
        let login = self
            .0
            .query_row(
                "SELECT login FROM profiles
                    WHERE access_token IS NOT NULL
                    ORDER BY created_at
                    LIMIT 1
                ;",
                [],
                |x| x.get(0),
            )
            .optional()?;
        Ok(login)
    }
}

/// Migrates database.
fn migrate(db: &Database) -> Result<(), anyhow::Error> {
    db.0.execute_batch(MIGRATIONS)?;
    Ok(())
}

/// Inserts an empty profile unless one exists.
fn ensure_profile(db: &Database, login: &str) -> Result<(), anyhow::Error> {
    db.0.execute(
        "INSERT OR IGNORE INTO profiles (login, created_at) VALUES (?, ?);",
        params![login, Utc::now()],
    )?;
    Ok(())
}

fn read_profile(x: &Row<'_>) -> rusqlite::Result<Profile> {
    let token: Option<String> = x.get(7)?;
    Ok(Profile {
        login: x.get(0)?,
        name: x.get(1)?,
        about: x.get(2)?,
        twitter: x.get(3)?,
        linkedin: x.get(4)?,
        mail: x.get(5)?,
        portfolio: x.get(6)?,
        has_github_token: token.is_some(),
        created_at: x.get(8)?,
    })
}

fn get_profile(db: &Database, login: &str) -> Result<Option<Profile>, anyhow::Error> {
    let mut stmt = db.0.prepare_cached(
        "SELECT login, name, about, twitter, linkedin, mail, portfolio, access_token, created_at
            FROM profiles
            WHERE login = ?
        ;",
    )?;
    let profile = stmt.query_row([login], read_profile).optional()?;
    Ok(profile)
}

fn update_profile(
    db: &mut Database,
    login: &str,
    update: &ProfileUpdate,
) -> Result<Profile, anyhow::Error> {
    // empty strings count as absent
    fn non_empty(x: &Option<String>) -> Option<&str> {
        x.as_deref().filter(|x| !x.is_empty())
    }

    ensure_profile(db, login)?;
    let tx = db.0.transaction()?;
    tx.execute(
        "UPDATE profiles
            SET
                name = COALESCE(?, name),
                about = COALESCE(?, about),
                twitter = COALESCE(?, twitter),
                linkedin = COALESCE(?, linkedin),
                mail = COALESCE(?, mail),
                portfolio = COALESCE(?, portfolio)
            WHERE
                login = ?
        ;",
        params![
            non_empty(&update.name),
            non_empty(&update.about),
            non_empty(&update.twitter),
            non_empty(&update.linkedin),
            non_empty(&update.mail),
            non_empty(&update.portfolio),
            login,
        ],
    )?;
    tx.commit()?;
    get_profile(db, login)?.ok_or_else(|| anyhow::Error::msg(format!("profile `{login}` vanished")))
}

/// Links to share a maintainer's public profile.
pub fn share_links(frontend_url: &str, login: &str) -> ShareLinks {
    let share_url = format!("{}/profile/{}", frontend_url.trim_end_matches('/'), login);
    let encoded = utf8_percent_encode(&share_url, URI_COMPONENT).to_string();
    ShareLinks {
        qr_code_url: format!("{QR_CODE_ENDPOINT}{encoded}"),
        share_url,
    }
}
