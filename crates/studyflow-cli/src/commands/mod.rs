pub mod config;
pub mod log;
pub mod quiet_hours;
pub mod safe_mode;
pub mod slot;
pub mod state;
pub mod stats;

use studyflow_core::{Config, LoadSource, RepositoryError, SqliteBackend, StateRepository};

pub type Repository = StateRepository<SqliteBackend>;

/// Load the config and open the state stored in the data directory.
///
/// Recovered startup conditions are reported on stderr, not returned.
pub fn open_repository() -> Result<(Repository, Config), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let backend = SqliteBackend::open_default()?;
    let repo = StateRepository::initialize(backend, &config);
    tracing::debug!(source = ?repo.load_source(), "state repository opened");

    if let LoadSource::Recovered { backup_key } = repo.load_source() {
        match backup_key {
            Some(key) => eprintln!("warning: stored state was unreadable; saved a copy as {key}"),
            None => eprintln!(
                "warning: stored state was unreadable and could not be backed up; left it in place"
            ),
        }
    }
    if let Some(e) = repo.startup_error() {
        eprintln!("warning: state not saved: {e}");
    }
    Ok((repo, config))
}

/// Downgrade a persist failure to a warning; the change itself went through.
pub fn applied(result: Result<(), RepositoryError>) -> Result<(), RepositoryError> {
    match result {
        Err(e) if e.is_applied() => {
            eprintln!("warning: {e}");
            Ok(())
        }
        other => other,
    }
}
