//! Sync command: one run-once reconciliation.

use moodlesync_engine::{SyncError, check_session, run_sync};
use tracing::{error, info};

use crate::cli::SyncArgs;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Runs one sync, or only checks the site session with `--check-session`.
pub async fn run(config: &ClientConfig, args: &SyncArgs) -> ClientResult<()> {
    let mut config = config.clone();
    config.apply_sync_args(args);
    let settings = config.to_settings();

    if args.check_session {
        let user_id = check_session(&settings).await?;
        println!("Session is valid (user id {}).", user_id);
        return Ok(());
    }

    info!(
        calendar = %settings.calendar_name,
        months = settings.num_of_months,
        "starting sync"
    );
    let report = run_sync(&settings).await.inspect_err(|e| {
        if let SyncError::Provider(err) = e {
            error!(
                code = err.code().as_str(),
                transport = err.code().is_transport(),
                "sync aborted"
            );
        }
    })?;
    println!("{}", report);
    Ok(())
}
