//! linkding CLI - command-line access to a linkding bookmark server.
//!
//! Mirrors what the browser extension does: log in with an API token,
//! bookmark a URL, look up tags, search, and check whether a page is
//! already saved. Output is JSON on stdout.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use linkding_core::auth::CredentialStore;
use linkding_core::config::normalize_base_url;
use linkding_core::{ApiError, AutoGrant, Configuration, LinkdingApi, SearchOptions, Settings};
use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// Overrides the stored server URL
const URL_ENV: &str = "LINKDING_URL";

/// Overrides the token stored in the keychain
const TOKEN_ENV: &str = "LINKDING_TOKEN";

/// File name prefix for the rolling log written with `--log-file`
const LOG_FILE_PREFIX: &str = "linkding.log";

const USAGE: &str = "\
Usage: linkding [--log-file <dir>] <command>

Commands:
  login <base-url>                  Store a server URL and API token
  logout                            Remove the stored token
  test                              Check that the server is reachable
  get <id>                          Show a bookmark
  save <url> [--title <title>] [--tags <a,b>] [--unread]
                                    Bookmark a URL
  delete <id>                       Delete a bookmark
  tags                              List all tags
  search <text> [--limit <n>]       Search bookmarks
  check <url>                       Check whether a URL is bookmarked
  profile                           Show the user profile
  status                            Show profile and tag count";

#[derive(Debug, PartialEq)]
enum Command {
    Login { base_url: String },
    Logout,
    Api(ApiCommand),
}

/// Commands that talk to the configured server.
#[derive(Debug, PartialEq)]
enum ApiCommand {
    Test,
    Get { id: u64 },
    Save {
        url: String,
        title: Option<String>,
        tags: Vec<String>,
        unread: bool,
    },
    Delete { id: u64 },
    Tags,
    Search { text: String, limit: Option<u32> },
    Check { url: String },
    Profile,
    Status,
}

#[derive(Debug, PartialEq)]
struct Cli {
    command: Command,
    log_dir: Option<PathBuf>,
}

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file and must live until exit.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    let _guard = init_tracing(cli.log_dir.as_deref());
    debug!(command = ?cli.command, "Starting");

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Argument parsing
// ============================================================================

fn parse_args(args: &[String]) -> Result<Cli> {
    let mut log_dir = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--log-file" {
            let dir = iter.next().ok_or_else(|| anyhow!("--log-file needs a directory"))?;
            log_dir = Some(PathBuf::from(dir));
        } else {
            rest.push(arg.as_str());
        }
    }

    let (name, params) = rest.split_first().ok_or_else(|| anyhow!("No command given"))?;
    let command = match *name {
        "login" => Command::Login {
            base_url: positional(params, "base URL")?.to_string(),
        },
        "logout" => Command::Logout,
        "test" => Command::Api(ApiCommand::Test),
        "get" => Command::Api(ApiCommand::Get {
            id: parse_id(positional(params, "bookmark id")?)?,
        }),
        "delete" => Command::Api(ApiCommand::Delete {
            id: parse_id(positional(params, "bookmark id")?)?,
        }),
        "save" => Command::Api(parse_save(params)?),
        "tags" => Command::Api(ApiCommand::Tags),
        "search" => Command::Api(parse_search(params)?),
        "check" => Command::Api(ApiCommand::Check {
            url: positional(params, "URL")?.to_string(),
        }),
        "profile" => Command::Api(ApiCommand::Profile),
        "status" => Command::Api(ApiCommand::Status),
        other => bail!("Unknown command: {}", other),
    };

    Ok(Cli { command, log_dir })
}

fn positional<'a>(params: &[&'a str], what: &str) -> Result<&'a str> {
    params
        .first()
        .copied()
        .ok_or_else(|| anyhow!("Missing {}", what))
}

fn parse_id(value: &str) -> Result<u64> {
    value
        .parse()
        .with_context(|| format!("Invalid bookmark id: {}", value))
}

fn parse_save(params: &[&str]) -> Result<ApiCommand> {
    let url = positional(params, "URL")?.to_string();
    let mut title = None;
    let mut tags = Vec::new();
    let mut unread = false;

    let mut iter = params[1..].iter();
    while let Some(flag) = iter.next() {
        match *flag {
            "--title" => {
                title = Some(iter.next().ok_or_else(|| anyhow!("--title needs a value"))?.to_string());
            }
            "--tags" => {
                let value = iter.next().ok_or_else(|| anyhow!("--tags needs a value"))?;
                tags = value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "--unread" => unread = true,
            other => bail!("Unknown option for save: {}", other),
        }
    }

    Ok(ApiCommand::Save {
        url,
        title,
        tags,
        unread,
    })
}

fn parse_search(params: &[&str]) -> Result<ApiCommand> {
    let mut words = Vec::new();
    let mut limit = None;

    let mut iter = params.iter();
    while let Some(param) = iter.next() {
        if *param == "--limit" {
            let value = iter.next().ok_or_else(|| anyhow!("--limit needs a value"))?;
            limit = Some(
                value
                    .parse()
                    .with_context(|| format!("Invalid limit: {}", value))?,
            );
        } else {
            words.push(*param);
        }
    }

    Ok(ApiCommand::Search {
        text: words.join(" "),
        limit,
    })
}

// ============================================================================
// Commands
// ============================================================================

/// Resolve the server URL and token from the environment, the settings
/// file and the keychain, in that order.
fn load_configuration(settings: &Settings) -> Result<Configuration> {
    let base_url = std::env::var(URL_ENV)
        .ok()
        .or_else(|| settings.base_url.clone())
        .map(|url| normalize_base_url(&url))
        .ok_or_else(|| anyhow!("No server configured. Run `linkding login <url>` or set {}.", URL_ENV))?;

    let token = match std::env::var(TOKEN_ENV) {
        Ok(token) => token,
        Err(_) => CredentialStore::get_token(&base_url)
            .with_context(|| format!("No API token stored for {}", base_url))?,
    };

    Ok(Configuration::new(base_url, token)?)
}

fn client(configuration: Configuration) -> Result<LinkdingApi> {
    Ok(LinkdingApi::new(configuration, Arc::new(AutoGrant))?)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Command) -> Result<()> {
    let settings = Settings::load()?;

    match command {
        Command::Login { base_url } => login(settings, &base_url).await,
        Command::Logout => {
            let base_url = settings
                .base_url
                .as_deref()
                .ok_or_else(|| anyhow!("Not logged in"))?;
            CredentialStore::delete(base_url)?;
            info!(server = base_url, "Removed stored token");
            Ok(())
        }
        Command::Api(command) => {
            let api = client(load_configuration(&settings)?)?;
            execute(&api, &settings, command).await
        }
    }
}

async fn login(mut settings: Settings, base_url: &str) -> Result<()> {
    let token = match std::env::var(TOKEN_ENV) {
        Ok(token) => token,
        Err(_) => rpassword::prompt_password("API token: ")?,
    };

    let configuration = Configuration::new(base_url, token)?;
    let api = client(configuration.clone())?;
    if !api.test_connection().await {
        bail!(
            "Could not connect to {}. Check the URL and token.",
            configuration.base_url()
        );
    }

    CredentialStore::store(configuration.base_url(), configuration.token())?;
    settings.base_url = Some(configuration.base_url().to_string());
    settings.save()?;
    info!(server = configuration.base_url(), "Logged in");
    eprintln!("Logged in to {}", configuration.base_url());
    Ok(())
}

/// Body for a new bookmark. An absent title is left for the server to fill.
fn bookmark_payload(url: &str, title: Option<&str>, tags: &[String], unread: bool) -> Value {
    let mut bookmark = json!({
        "url": url,
        "tag_names": tags,
        "unread": unread,
    });
    if let Some(title) = title {
        bookmark["title"] = json!(title);
    }
    bookmark
}

/// Whether a URL check found an existing bookmark. A failed check is
/// treated as "not found".
fn already_bookmarked(lookup: &Result<Value, ApiError>) -> bool {
    match lookup {
        Ok(check) => check.get("bookmark").is_some_and(|b| !b.is_null()),
        Err(_) => false,
    }
}

/// Page title the server scraped during a URL check. A failed check only
/// costs the suggestion; the save goes ahead without it.
fn scraped_title(lookup: &Result<Value, ApiError>) -> Option<String> {
    match lookup {
        Ok(check) => check
            .pointer("/metadata/title")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        Err(e) => {
            debug!(error = %e, "URL check failed, saving without a scraped title");
            None
        }
    }
}

async fn execute(api: &LinkdingApi, settings: &Settings, command: ApiCommand) -> Result<()> {
    match command {
        ApiCommand::Test => {
            let connected = api.test_connection().await;
            println!("{}", if connected { "connected" } else { "not connected" });
            if !connected {
                bail!("Could not reach {}", api.configuration().base_url());
            }
        }
        ApiCommand::Get { id } => print_json(&api.get_bookmark(id).await?)?,
        ApiCommand::Save {
            url,
            title,
            tags,
            unread,
        } => {
            // Like the extension popup: reuse the scraped page title when none is given
            let lookup = api.check(&url).await;
            if already_bookmarked(&lookup) {
                eprintln!("Note: {} is already bookmarked", url);
            }
            let title = title.or_else(|| scraped_title(&lookup));
            let bookmark = bookmark_payload(&url, title.as_deref(), &tags, unread);
            print_json(&api.save_bookmark(&bookmark).await?)?;
        }
        ApiCommand::Delete { id } => {
            api.delete_bookmark(id).await?;
            eprintln!("Deleted bookmark {}", id);
        }
        ApiCommand::Tags => print_json(&Value::Array(api.get_tags().await?))?,
        ApiCommand::Search { text, limit } => {
            let options = match limit {
                Some(limit) => SearchOptions::with_limit(limit),
                None => settings.search_options(),
            };
            print_json(&Value::Array(api.search(&text, &options).await?))?;
        }
        ApiCommand::Check { url } => print_json(&api.check(&url).await?)?,
        ApiCommand::Profile => print_json(&api.get_user_profile().await?)?,
        ApiCommand::Status => {
            let (profile, tags) = futures::join!(api.get_user_profile(), api.get_tags());
            print_json(&json!({
                "server": api.configuration().base_url(),
                "profile": profile?,
                "tags": tags?.len(),
            }))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_args(&args("tags")).unwrap().command, Command::Api(ApiCommand::Tags));
        assert_eq!(parse_args(&args("get 42")).unwrap().command, Command::Api(ApiCommand::Get { id: 42 }));
        assert_eq!(
            parse_args(&args("login https://links.example.com")).unwrap().command,
            Command::Login {
                base_url: "https://links.example.com".to_string()
            }
        );
    }

    #[test]
    fn test_parse_log_file_anywhere() {
        let cli = parse_args(&args("profile --log-file /tmp/logs")).unwrap();
        assert_eq!(cli.command, Command::Api(ApiCommand::Profile));
        assert_eq!(cli.log_dir, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn test_parse_save() {
        let cli = parse_args(&args("save https://a.example --tags rust,,web --unread --title Hi")).unwrap();
        assert_eq!(
            cli.command,
            Command::Api(ApiCommand::Save {
                url: "https://a.example".to_string(),
                title: Some("Hi".to_string()),
                tags: vec!["rust".to_string(), "web".to_string()],
                unread: true,
            })
        );
    }

    #[test]
    fn test_parse_search() {
        let cli = parse_args(&args("search foo bar --limit 5")).unwrap();
        assert_eq!(
            cli.command,
            Command::Api(ApiCommand::Search {
                text: "foo bar".to_string(),
                limit: Some(5)
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&[]).is_err());
        assert!(parse_args(&args("get abc")).is_err());
        assert!(parse_args(&args("frobnicate")).is_err());
        assert!(parse_args(&args("search x --limit")).is_err());
    }

    #[test]
    fn test_bookmark_payload() {
        let tags = vec!["rust".to_string()];
        let bookmark = bookmark_payload("https://a.example", None, &tags, false);
        assert_eq!(
            bookmark,
            json!({"url": "https://a.example", "tag_names": ["rust"], "unread": false})
        );
        let bookmark = bookmark_payload("https://a.example", Some("A"), &[], true);
        assert_eq!(bookmark["title"], "A");
        assert_eq!(bookmark["unread"], true);
    }

    #[test]
    fn test_scraped_title_from_check() {
        let lookup = Ok(json!({"bookmark": null, "metadata": {"title": "Example Domain"}}));
        assert_eq!(scraped_title(&lookup), Some("Example Domain".to_string()));
        assert!(!already_bookmarked(&lookup));

        let lookup = Ok(json!({"bookmark": {"id": 4}, "metadata": {"title": ""}}));
        assert_eq!(scraped_title(&lookup), None);
        assert!(already_bookmarked(&lookup));
    }

    #[test]
    fn test_failed_check_does_not_block_save() {
        let lookup = Err(ApiError::InvalidResponse("not json".to_string()));
        assert_eq!(scraped_title(&lookup), None);
        assert!(!already_bookmarked(&lookup));
    }
}
