use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use larder::auth::{generate_token, token_digest};
use larder::config::Config;
use larder::models::{Ingredient, NewUser, Tag};
use larder::shortlink::{ShortLinkError, ShortLinkService};
use larder::storage::{self, StorageError};

#[derive(Parser)]
#[command(name = "larder-admin")]
#[command(about = "Larder admin management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user and print their API token
    CreateUser {
        username: String,
        email: String,
        first_name: String,
        last_name: String,
    },
    /// Issue a new API token for a user, invalidating the old one
    RotateToken { username: String },
    /// Add a recipe tag
    AddTag {
        name: String,
        /// Letters, digits, '-' and '_' only
        slug: String,
    },
    /// Add an ingredient to the catalog
    AddIngredient {
        name: String,
        /// Measurement unit, e.g. "g" or "pcs"
        unit: String,
    },
    /// Print the short URL for a full URL, creating it if needed
    Shorten { url: String },
    /// Print the full URL a short code points at
    Resolve { code: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage = storage::connect(&config.database).await?;

    // Ensure database is initialized
    storage.init().await?;

    match cli.command {
        Commands::CreateUser {
            username,
            email,
            first_name,
            last_name,
        } => {
            let token = generate_token();
            let new_user = NewUser {
                username,
                email,
                first_name,
                last_name,
            };
            let user = match storage.create_user(&new_user, &token_digest(&token)).await {
                Ok(user) => user,
                Err(StorageError::Conflict) => {
                    bail!("A user with that username or email already exists")
                }
                Err(e) => return Err(e.into()),
            };
            println!("✓ Created user '{}' (id {})", user.username, user.id);
            println!("  Token: {}", token);
        }
        Commands::RotateToken { username } => {
            let token = generate_token();
            if storage
                .set_user_token(&username, &token_digest(&token))
                .await?
            {
                println!("✓ New token for '{}': {}", username, token);
            } else {
                println!("⚠ User '{}' not found", username);
            }
        }
        Commands::AddTag { name, slug } => {
            Tag::validate_new(&name, &slug).map_err(anyhow::Error::msg)?;
            match storage.create_tag(&name, &slug).await {
                Ok(tag) => println!("✓ Added tag '{}' ({}) with id {}", tag.name, tag.slug, tag.id),
                Err(StorageError::Conflict) => {
                    bail!("A tag with that name or slug already exists")
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::AddIngredient { name, unit } => {
            Ingredient::validate_new(&name, &unit).map_err(anyhow::Error::msg)?;
            match storage.create_ingredient(&name, &unit).await {
                Ok(ingredient) => println!(
                    "✓ Added ingredient '{}' ({}) with id {}",
                    ingredient.name, ingredient.measurement_unit, ingredient.id
                ),
                Err(StorageError::Conflict) => {
                    bail!("Ingredient '{}' with unit '{}' already exists", name, unit)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Shorten { url } => {
            let service = ShortLinkService::new(storage, config.short_links.clone());
            let short_url = service
                .shorten(&url)
                .await
                .context("Failed to create short link")?;
            println!("{}", short_url);
        }
        Commands::Resolve { code } => {
            let service = ShortLinkService::new(storage, config.short_links.clone());
            match service.resolve(&code).await {
                Ok(full_url) => println!("{}", full_url),
                Err(ShortLinkError::NotFound(code)) => {
                    println!("⚠ Short code '{}' not found", code)
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
