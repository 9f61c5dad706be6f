//! Command handlers. Each one drives the [`Console`] and prints the result.

use std::fs;

use anyhow::{anyhow, Context, Result};
use clm_sdk::{
    ConfigurationList, Console, LaunchResolution, Session, SessionState, TaskOutcome, Token,
};
use serde::Serialize;
use tracing::debug;

use crate::{Commands, DEFAULT_XML_PAYLOAD};

/// Token details safe to print.
#[derive(Debug, Serialize)]
struct TokenSummary {
    access_token: String,
    token_type: String,
    expires_in: i64,
    issued_at: String,
    expires_at: String,
    valid: bool,
}

impl From<&Token> for TokenSummary {
    fn from(token: &Token) -> Self {
        Self {
            access_token: token.redacted_access_token(),
            token_type: token.token_type.clone(),
            expires_in: token.expires_in,
            issued_at: token.issued_at.to_rfc3339(),
            expires_at: token.expires_at().to_rfc3339(),
            valid: token.is_valid(),
        }
    }
}

pub async fn run(console: &Console, command: Commands, json: bool) -> Result<()> {
    let mut session = console.session();

    match command {
        Commands::Login { code: None } => {
            let url = console.begin_login(&session)?;
            println!("Open this URL in a browser to grant access:\n\n  {url}\n");
            println!("Then run `clm-cli login --code <code>` with the code from the redirect.");
        }
        Commands::Login { code: Some(code) } => {
            let code = extract_code(&code);
            let token = console.complete_login(&mut session, code).await?;
            print_token(token, json)?;
        }
        Commands::Status => {
            let state = console.resume(&mut session).await?;
            match (&session.token, json) {
                (Some(token), true) => print_json(&TokenSummary::from(token))?,
                (Some(token), false) => {
                    println!("state: {state}");
                    print_token(token, false)?;
                }
                (None, true) => print_json(&serde_json::json!({ "state": state.to_string() }))?,
                (None, false) => println!("state: {state} (run `clm-cli login`)"),
            }
        }
        Commands::Configs { search } => {
            let list = configurations(console, &mut session).await?;
            let shown = list.filter(search.as_deref().unwrap_or_default());
            if json {
                print_json(&shown)?;
            } else {
                for cfg in &shown {
                    println!("{}\t{}", cfg.display_name(), cfg.href.as_deref().unwrap_or("-"));
                }
                println!("{} of {} configuration(s)", shown.len(), list.total);
            }
        }
        Commands::Launch { config, xml, xml_file } => {
            let payload = match (xml, xml_file) {
                (Some(xml), _) => xml,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => DEFAULT_XML_PAYLOAD.to_string(),
            };
            resume(console, &mut session).await?;
            let href = if is_href(&config) {
                config
            } else {
                let list = console.configurations(&mut session, false).await?;
                resolve_href(&list, &config)?
            };
            debug!(%href, bytes = payload.len(), "launching task");
            let outcome = console.create_task(&mut session, &href, &payload).await?;
            print_outcome(&outcome, json)?;
        }
        Commands::Document { id } => {
            resume(console, &mut session).await?;
            let doc = console.document_attributes(&mut session, &id).await?;
            print_json(&doc)?;
        }
        Commands::Logout => {
            let removed = console.disconnect(&mut session);
            if removed {
                println!("Disconnected; stored token deleted.");
            } else {
                println!("Disconnected; no stored token.");
            }
        }
    }

    Ok(())
}

async fn resume(console: &Console, session: &mut Session) -> Result<()> {
    if console.resume(session).await? == SessionState::NoToken {
        return Err(clm_sdk::ConsoleError::Auth("not authenticated".into()).into());
    }
    Ok(())
}

async fn configurations(console: &Console, session: &mut Session) -> Result<ConfigurationList> {
    resume(console, session).await?;
    Ok(console.configurations(session, false).await?)
}

/// Accept either a bare code or the whole redirect URL.
fn extract_code(input: &str) -> &str {
    let input = input.trim();
    let Some(query) = input.split_once('?').map(|(_, q)| q) else {
        return input;
    };
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("code="))
        .unwrap_or(input)
}

fn is_href(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn resolve_href(list: &ConfigurationList, key: &str) -> Result<String> {
    let cfg = list
        .find(key)
        .ok_or_else(|| anyhow!("no configuration matches \"{key}\""))?;
    cfg.href
        .clone()
        .ok_or_else(|| anyhow!("configuration \"{}\" has no href", cfg.display_name()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_token(token: &Token, json: bool) -> Result<()> {
    let summary = TokenSummary::from(token);
    if json {
        return print_json(&summary);
    }
    println!("access token: {}", summary.access_token);
    println!("token type:   {}", summary.token_type);
    println!("expires in:   {}s (at {})", summary.expires_in, summary.expires_at);
    Ok(())
}

fn print_outcome(outcome: &TaskOutcome, json: bool) -> Result<()> {
    if json {
        return print_json(outcome);
    }
    match outcome.result.status.as_deref() {
        Some(status) if outcome.result.is_success() => println!("Status: {status}"),
        Some(status) => println!("Status: {status} (not yet successful)"),
        None => println!("Task created."),
    }
    match &outcome.launch {
        Some(LaunchResolution::Resolved { url }) => println!("Open DocLauncher: {url}"),
        Some(LaunchResolution::Failed { reason }) => {
            println!("Task created, but the DocLauncher URL could not be resolved: {reason}");
        }
        None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clm_sdk::Configuration;

    #[test]
    fn code_from_redirect_url() {
        assert_eq!(extract_code("abc123"), "abc123");
        assert_eq!(extract_code("https://x/?code=abc123"), "abc123");
        assert_eq!(extract_code("https://x/?state=s&code=abc123&extra=1"), "abc123");
        assert_eq!(extract_code("https://x/?state=s"), "https://x/?state=s");
    }

    #[test]
    fn href_resolution() {
        let list = ConfigurationList::new(vec![Configuration {
            id: Some("9".into()),
            name: Some("NDA".into()),
            href: Some("https://api/cfg/9".into()),
        }]);
        assert_eq!(resolve_href(&list, "9").unwrap(), "https://api/cfg/9");
        assert_eq!(resolve_href(&list, "NDA (9)").unwrap(), "https://api/cfg/9");
        assert!(resolve_href(&list, "nope").is_err());
        assert!(is_href("https://api/cfg/9"));
        assert!(!is_href("9"));
    }
}
