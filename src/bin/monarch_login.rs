//! Interactive one-time login utility.
//!
//! Walks the candidate session locations first and keeps a session that
//! still works. Otherwise prompts for credentials (environment values
//! are used when set), handles the multi-factor challenge, verifies the
//! fresh session with a real API call, and saves it to every location
//! the server searches.
//!
//! Errors are printed for the user rather than mapped to exit codes;
//! every reachable path exits 0.

#![allow(
    clippy::print_stdout,
    reason = "interactive setup utility writes its prompts and report to stdout"
)]

use std::io::{self, Write as _};

use tracing_subscriber::EnvFilter;

use monarch_mcp::client::{MonarchClient, MonarchGateway as _};
use monarch_mcp::config::ServerConfig;
use monarch_mcp::error::{MonarchError, MonarchResult};
use monarch_mcp::session;

/// Reads one trimmed line from stdin after printing a label.
fn prompt(label: &str) -> io::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    let _bytes = io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

/// Verifies a client by listing accounts; reports the outcome.
async fn test_session(client: &MonarchClient) -> bool {
    match client.accounts().await {
        Ok(accounts) => {
            println!("Session valid - found {} accounts", accounts.len());
            true
        }
        Err(err) => {
            println!("Session test failed: {err}");
            false
        }
    }
}

/// Tries every candidate path for a session that still works.
async fn find_working_session(config: &ServerConfig) -> Option<MonarchClient> {
    let candidates = config.candidate_session_paths();
    println!("Checking for existing sessions...");
    for path in &candidates {
        if !path.exists() {
            continue;
        }
        match session::Session::load(path) {
            Ok(saved) => {
                println!("  Found session at {}", path.display());
                let client = MonarchClient::from_session(config, saved);
                if test_session(&client).await {
                    return Some(client);
                }
            }
            Err(err) => println!("  Skipping {}: {err}", path.display()),
        }
    }
    None
}

/// Prompts for credentials and runs the login state machine.
///
/// The primary login may raise the second-factor challenge; in that case
/// the one-time code is collected and a second, distinct exchange runs
/// on a fresh client. The challenged client is discarded, so its state
/// is never persisted.
async fn login_interactively(config: &ServerConfig) -> MonarchResult<Option<MonarchClient>> {
    println!();
    println!("No valid session found. Please log in:");
    println!();

    let email = match config.email() {
        Some(configured) => {
            println!("Email (from environment): {configured}");
            configured.to_owned()
        }
        None => prompt("Email: ")?,
    };
    let password = match config.credentials() {
        Some(credentials) => credentials.password,
        None => prompt("Password: ")?,
    };

    println!();
    println!("Authenticating...");
    match MonarchClient::login(config, &email, &password).await {
        Ok(client) => {
            println!("Login successful (no MFA required)");
            Ok(Some(client))
        }
        Err(MonarchError::MfaRequired) => {
            println!("MFA required");
            let code = prompt("Two-factor code: ")?;
            match MonarchClient::login_with_mfa(config, &email, &password, &code).await {
                Ok(client) => {
                    println!("MFA authentication successful");
                    Ok(Some(client))
                }
                Err(err) => {
                    println!("MFA login failed: {err}");
                    Ok(None)
                }
            }
        }
        Err(err) => {
            println!("Login failed: {err}");
            Ok(None)
        }
    }
}

/// Saves the session everywhere and prints the per-location report.
fn save_everywhere(client: &MonarchClient, config: &ServerConfig) {
    println!();
    println!("Saving session to all known locations...");
    let report = session::persist(&client.session(), &config.candidate_session_paths());
    for path in report.saved() {
        println!("  Saved to {}", path.display());
    }
    for (path, reason) in report.failures() {
        println!("  Failed to save to {}: {reason}", path.display());
    }
    if report.succeeded() {
        println!();
        println!("Setup complete. The session is saved; restart your MCP client");
        println!("and the Monarch tools (get_accounts, get_transactions, ...) will work.");
    } else {
        println!();
        println!("Warning: the session could not be saved to any location.");
    }
}

/// Runs the whole setup flow.
async fn run(config: ServerConfig) -> MonarchResult<()> {
    println!();
    println!("Monarch Money - authentication setup");
    println!("------------------------------------");
    println!("Saves your session to every location the MCP server searches.");
    println!();

    let client = match find_working_session(&config).await {
        Some(existing) => {
            println!("Existing session is still valid.");
            existing
        }
        None => match login_interactively(&config).await? {
            Some(fresh) => fresh,
            None => return Ok(()),
        },
    };

    println!();
    println!("Testing connection...");
    if !test_session(&client).await {
        println!("The session is not working; nothing was saved.");
        return Ok(());
    }

    save_everywhere(&client, &config);
    Ok(())
}

#[tokio::main]
async fn main() {
    // Tracing goes to stderr so the interactive output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = ServerConfig::from_env();
    if let Err(err) = run(config).await {
        println!("Setup failed: {err}");
    }
}
