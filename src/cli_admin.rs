use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli_style;

use cli_style::{
    get_styles, print_empty_list, print_error, print_key_value, print_list_item,
    print_section_footer, print_section_header, print_success,
};
use musicboxd_server::identity::{AuthTokenValue, UserStore};
use musicboxd_server::store::SqliteStore;
use musicboxd_server::tags::TagStore;

const DB_FILE_NAME: &str = "musicboxd.db";

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles(), name = "musicboxd-admin")]
struct CliArgs {
    /// Directory containing musicboxd.db. The database is created if missing.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: PathBuf,

    #[command(subcommand)]
    command: AdminCommand,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Creates a user with the given email.
    AddUser { email: String },

    /// Issues a new auth token for the user with the given email.
    IssueToken { email: String },

    /// Revokes an auth token. The next request presenting it is rejected.
    RevokeToken { token: String },

    /// Shows all users.
    ListUsers,

    /// Adds a preset tag. Adding an existing (category, name) pair is a no-op.
    AddPresetTag { category: String, name: String },

    /// Shows all preset tags.
    ListPresetTags,
}

fn find_user_id(store: &SqliteStore, email: &str) -> Result<String> {
    match store.get_user_by_email(email)? {
        Some(user) => Ok(user.id),
        None => bail!("No user with email {}", email),
    }
}

async fn execute(store: &SqliteStore, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::AddUser { email } => {
            let user = store.create_user(email.trim())?;
            print_success(&format!("Created user {} with id {}", user.email, user.id));
        }
        AdminCommand::IssueToken { email } => {
            let user_id = find_user_id(store, &email)?;
            let token = store.issue_auth_token(&user_id)?;
            print_success(&format!("Issued token for {}", email));
            print_key_value("token", token.value.as_str());
        }
        AdminCommand::RevokeToken { token } => {
            match store.revoke_auth_token(&AuthTokenValue(token.trim().to_string()))? {
                Some(revoked) => {
                    print_success(&format!("Revoked token of user {}", revoked.user_id))
                }
                None => bail!("No such token"),
            }
        }
        AdminCommand::ListUsers => {
            let users = store.list_users()?;
            print_section_header("Users");
            if users.is_empty() {
                print_empty_list("No users yet");
            }
            for user in users {
                print_list_item(&format!("{} ({})", user.email, user.id));
            }
            print_section_footer();
        }
        AdminCommand::AddPresetTag { category, name } => {
            let tag = store.add_preset_tag(category.trim(), name.trim())?;
            print_success(&format!(
                "Preset tag {}/{} has id {}",
                tag.category, tag.name, tag.id
            ));
        }
        AdminCommand::ListPresetTags => {
            let tags = store.list_preset_tags().await?;
            print_section_header("Preset tags");
            if tags.is_empty() {
                print_empty_list("No preset tags yet");
            }
            for tag in tags {
                print_list_item(&format!("[{}] {} {}", tag.id, tag.category, tag.name));
            }
            print_section_footer();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    if !cli_args.db_dir.is_dir() {
        bail!("Database directory does not exist: {:?}", cli_args.db_dir);
    }
    let db_path = cli_args.db_dir.join(DB_FILE_NAME);
    let store = SqliteStore::new(&db_path)
        .with_context(|| format!("Failed to open database at {:?}", db_path))?;

    if let Err(err) = execute(&store, cli_args.command).await {
        print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
    Ok(())
}
