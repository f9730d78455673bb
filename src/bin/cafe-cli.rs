use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "cafe-cli")]
#[command(about = "Admin CLI for the café site", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Session token from `cafe-cli login`.
    #[arg(short, long, env = "CAFE_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and print a session token
    Login {
        #[arg(long, env = "ADMIN_EMAIL")]
        email: String,
        #[arg(long, env = "ADMIN_PASSWORD")]
        password: String,
    },
    /// Show what the server thinks of the current token
    Session,
    /// Menu items
    Menu {
        #[command(subcommand)]
        command: MenuCommands,
    },
    /// Social links
    Social {
        #[command(subcommand)]
        command: SocialCommands,
    },
}

#[derive(Subcommand)]
enum MenuCommands {
    /// List menu items
    List {
        #[arg(long)]
        featured: bool,
    },
    /// Delete one item by id, or a whole category
    Delete {
        id: Option<u64>,
        #[arg(long, conflicts_with = "id")]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
enum SocialCommands {
    /// List enabled links
    List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
    }

    let res = match cli.command {
        Commands::Login { email, password } => {
            client
                .post(format!("{}/api/auth/login", cli.url))
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?
        }
        Commands::Session => {
            client
                .get(format!("{}/api/auth/session", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Menu {
            command: MenuCommands::List { featured },
        } => {
            let url = if featured {
                format!("{}/api/menu?featured=1", cli.url)
            } else {
                format!("{}/api/menu", cli.url)
            };
            client.get(url).send().await?
        }
        Commands::Menu {
            command: MenuCommands::Delete { id, category },
        } => {
            let request = match (id, category) {
                (Some(id), _) => client.delete(format!("{}/api/menu/{id}", cli.url)),
                (None, Some(category)) => client
                    .delete(format!("{}/api/menu", cli.url))
                    .query(&[("category", category)]),
                (None, None) => {
                    eprintln!("Error: give an item id or --category");
                    std::process::exit(2);
                }
            };
            request.headers(headers).send().await?
        }
        Commands::Social {
            command: SocialCommands::List,
        } => {
            client
                .get(format!("{}/api/social-links", cli.url))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
