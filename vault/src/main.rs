//! `dsv-store`: command line access to a DevOps Secrets Vault secure store.

use clap::{Parser, Subcommand};
use dsv_common::init_tracing;
use dsv_secure_store::{Credential, SecureStore, StoreConfig};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "dsv-store",
    about = "Read and write secrets in DevOps Secrets Vault",
    version
)]
struct Cli {
    /// Context JSON with DevOpsVaultUrl, ClientId, ClientSecret and an optional BasePathPrefix
    #[arg(long, env = "DSV_CONTEXT", hide_env_values = true)]
    context: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check connectivity and credentials with a throwaway secret
    Validate,
    /// Store a value under the base path prefix
    CreateValue {
        /// Logical key of the secret
        key: String,
        /// Secret value
        #[arg(long, env = "DSV_VALUE", hide_env_values = true)]
        value: Option<String>,
    },
    /// Print the value stored at a vault path
    GetValue {
        /// Vault path returned when the value was stored
        path: String,
    },
    /// Store a user name and password under the base path prefix
    CreateCredentials {
        /// Logical key of the secret
        key: String,
        /// User name
        #[arg(long)]
        username: String,
        /// Password
        #[arg(long, env = "DSV_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Print the user name and password stored at a vault path
    GetCredentials {
        /// Vault path returned when the credentials were stored
        path: String,
    },
    /// Replace a value, moving it if its key changed
    UpdateValue {
        /// Logical key of the secret
        key: String,
        /// Vault path the secret currently lives at
        #[arg(long)]
        old_path: String,
        /// New secret value
        #[arg(long, env = "DSV_VALUE", hide_env_values = true)]
        value: Option<String>,
    },
    /// Replace a user name and password, moving them if the key changed
    UpdateCredentials {
        /// Logical key of the secret
        key: String,
        /// Vault path the secret currently lives at
        #[arg(long)]
        old_path: String,
        /// User name
        #[arg(long)]
        username: String,
        /// Password
        #[arg(long, env = "DSV_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Delete the secret at a vault path
    Remove {
        /// Vault path of the secret
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = StoreConfig::from_env()?;
    init_tracing(&config.tracing_config())?;

    let store = SecureStore::from_config(&config, Arc::new(config.token_cache()))?;
    let context = cli.context.as_str();

    match cli.command {
        Commands::Validate => {
            store.validate_context(context).await?;
            info!("Context is valid");
        }
        Commands::CreateValue { key, value } => {
            let path = store
                .create_value(context, Some(key.as_str()), value.as_deref())
                .await?;
            println!("{path}");
        }
        Commands::GetValue { path } => {
            println!("{}", store.get_value(context, Some(path.as_str())).await?);
        }
        Commands::CreateCredentials {
            key,
            username,
            password,
        } => {
            let credential = password.map(|p| Credential::new(username, p));
            let path = store
                .create_credentials(context, Some(key.as_str()), credential)
                .await?;
            println!("{path}");
        }
        Commands::GetCredentials { path } => {
            let credential = store.get_credentials(context, Some(path.as_str())).await?;
            println!("{}", credential.username);
            println!("{}", credential.password.expose_secret());
        }
        Commands::UpdateValue {
            key,
            old_path,
            value,
        } => {
            let path = store
                .update_value(context, Some(key.as_str()), &old_path, value.as_deref())
                .await?;
            println!("{path}");
        }
        Commands::UpdateCredentials {
            key,
            old_path,
            username,
            password,
        } => {
            let credential = password.map(|p| Credential::new(username, p));
            let path = store
                .update_credentials(context, Some(key.as_str()), &old_path, credential)
                .await?;
            println!("{path}");
        }
        Commands::Remove { path } => {
            store.remove_value(context, Some(path.as_str())).await?;
            info!(path = %path, "Secret removed");
        }
    }

    Ok(())
}
