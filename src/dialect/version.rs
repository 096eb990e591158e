use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use super::Dialect;
use crate::link::Link;

lazy_static! {
    static ref POSTGRES_VERSION: Regex =
        Regex::new(r"PostgreSQL (\d+)(?:\.(\d+))?").expect("valid postgres version regex");
    static ref DOTTED_VERSION: Regex =
        Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("valid dotted version regex");
}

/// A `major.minor.patch` server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// First dotted version number found in `text` (`"10.5.8-MariaDB"` → `10.5.8`).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let caps = DOTTED_VERSION.captures(text)?;
        Some(Self::new(
            caps.get(1)?.as_str().parse().ok()?,
            caps.get(2)?.as_str().parse().ok()?,
            caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?,
        ))
    }

    /// Parse the raw output of the dialect's version probe.
    #[must_use]
    pub fn parse_for(dialect: Dialect, text: &str) -> Option<Self> {
        match dialect {
            Dialect::Postgres => {
                let caps = POSTGRES_VERSION.captures(text)?;
                Some(Self::new(
                    caps.get(1)?.as_str().parse().ok()?,
                    caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?,
                    0,
                ))
            }
            _ => Self::parse(text),
        }
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Run the dialect's version probe over `link`.
///
/// Any failure (no probe statement, driver error, unparsable output) yields `None`, meaning
/// "version unknown".
pub async fn probe_server_version(link: &dyn Link) -> Option<ServerVersion> {
    let dialect = link.dialect();
    let sql = dialect.version_probe_sql()?;
    let records = match link.query(sql, &[]).await {
        Ok(records) => records,
        Err(err) => {
            debug!(%dialect, error = %err, "server version probe failed");
            return None;
        }
    };
    let raw = records
        .first()
        .and_then(|row| row.get_by_index(0))
        .and_then(|value| value.as_text().map(str::to_owned))?;
    let version = ServerVersion::parse_for(dialect, &raw);
    trace!(%dialect, raw = %raw, ?version, "server version probed");
    version
}

/// Once-only cache of the probed server version for one connection class.
///
/// An unknown result is cached too; the probe never runs twice.
#[derive(Debug, Default)]
pub struct VersionCache {
    cell: OnceCell<Option<ServerVersion>>,
}

impl VersionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache that already knows the answer; no probe will run.
    #[must_use]
    pub fn known(version: Option<ServerVersion>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(version)),
        }
    }

    pub async fn get_or_probe(&self, link: &dyn Link) -> Option<ServerVersion> {
        *self
            .cell
            .get_or_init(|| async { probe_server_version(link).await })
            .await
    }

    /// `None` until the probe has run.
    #[must_use]
    pub fn cached(&self) -> Option<Option<ServerVersion>> {
        self.cell.get().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vendor_banners() {
        assert_eq!(
            ServerVersion::parse_for(
                Dialect::Postgres,
                "PostgreSQL 16.2 on x86_64-pc-linux-gnu, compiled by gcc 12.2.0"
            ),
            Some(ServerVersion::new(16, 2, 0))
        );
        assert_eq!(
            ServerVersion::parse_for(Dialect::Postgres, "PostgreSQL 18beta1 on aarch64"),
            Some(ServerVersion::new(18, 0, 0))
        );
        assert_eq!(
            ServerVersion::parse_for(Dialect::MariaDb, "10.5.8-MariaDB-1:10.5.8+maria~focal"),
            Some(ServerVersion::new(10, 5, 8))
        );
        assert_eq!(
            ServerVersion::parse_for(Dialect::Sqlite, "3.45.1"),
            Some(ServerVersion::new(3, 45, 1))
        );
        assert_eq!(ServerVersion::parse("no digits here"), None);
    }

    #[test]
    fn versions_order_numerically() {
        assert!(ServerVersion::new(3, 9, 0) < ServerVersion::new(3, 35, 0));
        assert!(ServerVersion::new(10, 5, 0) <= ServerVersion::new(10, 5, 0));
    }

    #[test]
    fn known_cache_skips_probe() {
        let cache = VersionCache::known(None);
        assert_eq!(cache.cached(), Some(None));
        assert_eq!(VersionCache::new().cached(), None);
    }
}
