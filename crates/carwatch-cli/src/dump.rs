//! Gzipped `pg_dump` backups.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{bail, Context};
use carwatch_core::AppConfig;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::process::Command;

/// Dumps the database to `<dumps_dir>/dump_<YYYYmmdd_HHMMSS>.sql.gz`.
///
/// The timestamp is taken in the configured timezone. A failed dump removes
/// the partial file.
///
/// # Errors
///
/// Returns an error if the dumps directory cannot be created, `pg_dump` or
/// `gzip` cannot be spawned, or either exits unsuccessfully.
pub(crate) async fn dump_database(config: &AppConfig) -> anyhow::Result<PathBuf> {
    let tz: Tz = config
        .timezone
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid timezone '{}': {e}", config.timezone))?;

    tokio::fs::create_dir_all(&config.dumps_dir)
        .await
        .with_context(|| format!("creating {}", config.dumps_dir.display()))?;

    let path = config
        .dumps_dir
        .join(dump_file_name(Utc::now().with_timezone(&tz)));
    tracing::info!(path = %path.display(), "starting database dump");

    if let Err(e) = write_dump(&config.database_url, &path).await {
        if let Err(rm_err) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %rm_err, "could not remove partial dump");
        }
        return Err(e);
    }

    Ok(path)
}

async fn write_dump(database_url: &str, path: &std::path::Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut pg_dump = Command::new("pg_dump")
        .arg("--dbname")
        .arg(database_url)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("spawning pg_dump")?;

    let pg_stdout = pg_dump
        .stdout
        .take()
        .context("pg_dump stdout was not captured")?;
    let gzip_stdin: Stdio = pg_stdout.try_into().context("piping pg_dump into gzip")?;

    let gzip = Command::new("gzip")
        .arg("-c")
        .stdin(gzip_stdin)
        .stdout(Stdio::from(file))
        .stderr(Stdio::piped())
        .spawn()
        .context("spawning gzip")?;

    let (dump_out, gzip_out) =
        tokio::try_join!(pg_dump.wait_with_output(), gzip.wait_with_output())?;

    if !dump_out.status.success() {
        bail!(
            "pg_dump exited with {}: {}",
            dump_out.status,
            String::from_utf8_lossy(&dump_out.stderr).trim()
        );
    }
    if !gzip_out.status.success() {
        bail!(
            "gzip exited with {}: {}",
            gzip_out.status,
            String::from_utf8_lossy(&gzip_out.stderr).trim()
        );
    }

    Ok(())
}

fn dump_file_name(now: DateTime<Tz>) -> String {
    now.format("dump_%Y%m%d_%H%M%S.sql.gz").to_string()
}
