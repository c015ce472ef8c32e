//! Configuration commands.

use std::path::Path;

use moodlesync_providers::google::{CALENDAR_SCOPE, ClientSecrets, GOOGLE_SCOPES, TokenFile};
use moodlesync_providers::moodle::{LoginMethod, MoodleCredentials, SessionAuthenticator};
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the effective configuration to stdout.
pub fn dump(config: &ClientConfig, source: Option<&Path>) -> ClientResult<()> {
    let yaml = serde_yaml::to_string(config)
        .map_err(|e| ClientError::config(format!("failed to serialize config: {}", e)))?;
    match source {
        Some(path) => println!("# config.yaml ({})", path.display()),
        None => println!("# built-in defaults"),
    }
    print!("{}", yaml);
    Ok(())
}

/// Validate the configuration and the files it points at.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    let messages = check(config)?;
    for message in &messages {
        println!("{}", message);
    }
    println!("Configuration is valid.");
    Ok(())
}

/// Runs every check, returning informational messages.
fn check(config: &ClientConfig) -> ClientResult<Vec<String>> {
    let mut messages = Vec::new();

    if config.num_of_months == 0 {
        return Err(ClientError::config("num_of_months must be at least 1"));
    }
    if config.calendar_name.trim().is_empty() {
        return Err(ClientError::config("calendar_name must not be empty"));
    }

    let settings = config.to_settings();
    let method = settings.login_method()?;
    if let LoginMethod::Credentials(ref path) = method {
        let credentials = MoodleCredentials::from_file(path)?;
        messages.push(format!("Moodle credentials for {}.", credentials.username));
    } else {
        messages.push("Moodle login uses a session id.".to_string());
    }
    SessionAuthenticator::new(&settings.moodle_url, method)?;

    ClientSecrets::from_file(&settings.google_api_path)?;
    messages.push(format!(
        "Google client credentials in {}.",
        settings.google_api_path.display()
    ));

    let token = TokenFile::new(&settings.google_token_path)
        .load()
        .map_err(|e| {
            ClientError::config(format!(
                "{}; authorize these scopes out-of-band: {}",
                e.message(),
                GOOGLE_SCOPES.join(" ")
            ))
        })?;
    if !token.has_scope(CALENDAR_SCOPE) {
        warn!(scope = CALENDAR_SCOPE, "token does not list the calendar scope");
        messages.push(format!("Token is missing scope {}.", CALENDAR_SCOPE));
    }

    Ok(messages)
}

/// Show the configuration file path.
pub fn path(explicit: Option<&Path>) -> ClientResult<()> {
    match explicit {
        Some(path) => println!("config: {}", path.display()),
        None => println!("config: none (built-in defaults)"),
    }
    Ok(())
}
