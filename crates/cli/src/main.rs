mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blogkit")]
#[command(version, about = "Blog content manager and static site generator", long_about = None)]
struct Cli {
    /// Path to blog.toml
    #[arg(short, long, global = true, default_value = blogkit_core::config::CONFIG_FILE)]
    config: PathBuf,

    /// Runs `generate` when omitted
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the static site from published posts
    Generate {
        /// Output directory (overrides paths.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail on template placeholders with no value
        #[arg(long)]
        strict: bool,
    },

    /// Write blog.toml and the default templates into a directory
    Init {
        /// Directory to initialize
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Site title
        #[arg(long)]
        title: Option<String>,

        /// Public base URL of the site
        #[arg(long)]
        url: Option<String>,
    },

    /// Serve the generated site locally, regenerating when templates change
    Preview {
        /// Port to serve on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Check every post in the store without writing anything
    Validate,

    /// Sign in and remember the session
    Login {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
    },

    /// Sign out and forget the session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Manage posts
    Posts {
        #[command(subcommand)]
        command: PostsCommand,
    },

    /// Manage uploaded images
    Images {
        #[command(subcommand)]
        command: ImagesCommand,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum PostsCommand {
    /// List all posts, most recently updated first
    List,

    /// Show one post
    Show {
        /// Post id or slug
        post: String,
    },

    /// Create a post from an HTML file
    New {
        #[arg(long)]
        title: String,

        /// File holding the post body (HTML)
        #[arg(long)]
        content: PathBuf,

        /// Derived from the title when omitted
        #[arg(long)]
        slug: Option<String>,

        #[arg(long)]
        excerpt: Option<String>,

        /// Featured image URL
        #[arg(long)]
        image: Option<String>,

        /// Publish immediately instead of saving a draft
        #[arg(long)]
        publish: bool,
    },

    /// Change fields of an existing post
    Edit {
        /// Post id or slug
        post: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        slug: Option<String>,

        /// File holding the new body (HTML)
        #[arg(long)]
        content: Option<PathBuf>,

        #[arg(long)]
        excerpt: Option<String>,

        /// Featured image URL
        #[arg(long)]
        image: Option<String>,
    },

    /// Publish a post
    Publish {
        /// Post id or slug
        post: String,
    },

    /// Move a post back to draft
    Unpublish {
        /// Post id or slug
        post: String,
    },

    /// Delete a post permanently
    Delete {
        /// Post id or slug
        post: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum ImagesCommand {
    /// List uploaded images, newest first
    List,

    /// Upload an image file
    Upload {
        file: PathBuf,

        /// Alternative text
        #[arg(long)]
        alt: Option<String>,
    },

    /// Set or clear the alternative text of an image
    Alt {
        id: String,

        /// New text; clears it when omitted
        text: Option<String>,
    },

    /// Delete an image and its stored file
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config;

    match cli.command.unwrap_or(Command::Generate {
        output: None,
        strict: false,
    }) {
        Command::Generate { output, strict } => {
            commands::generate::run(&config, output, strict).await
        }
        Command::Init { path, title, url } => commands::init::run(path, title, url).await,
        Command::Preview { port } => commands::preview::run(&config, port).await,
        Command::Validate => commands::validate::run(&config).await,
        Command::Login { email } => commands::auth::login(&config, email).await,
        Command::Logout => commands::auth::logout(&config).await,
        Command::Whoami => commands::auth::whoami(&config).await,
        Command::Posts { command } => match command {
            PostsCommand::List => commands::posts::list(&config).await,
            PostsCommand::Show { post } => commands::posts::show(&config, &post).await,
            PostsCommand::New {
                title,
                content,
                slug,
                excerpt,
                image,
                publish,
            } => {
                let input = commands::posts::NewPostArgs {
                    title,
                    content,
                    slug,
                    excerpt,
                    image,
                    publish,
                };
                commands::posts::create(&config, input).await
            }
            PostsCommand::Edit {
                post,
                title,
                slug,
                content,
                excerpt,
                image,
            } => {
                let input = commands::posts::EditPostArgs {
                    title,
                    slug,
                    content,
                    excerpt,
                    image,
                };
                commands::posts::edit(&config, &post, input).await
            }
            PostsCommand::Publish { post } => commands::posts::publish(&config, &post).await,
            PostsCommand::Unpublish { post } => commands::posts::unpublish(&config, &post).await,
            PostsCommand::Delete { post, force } => {
                commands::posts::delete(&config, &post, force).await
            }
        },
        Command::Images { command } => match command {
            ImagesCommand::List => commands::images::list(&config).await,
            ImagesCommand::Upload { file, alt } => {
                commands::images::upload(&config, file, alt).await
            }
            ImagesCommand::Alt { id, text } => {
                commands::images::set_alt(&config, &id, text).await
            }
            ImagesCommand::Delete { id, force } => {
                commands::images::delete(&config, &id, force).await
            }
        },
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "blogkit", &mut io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is normal
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ {:#}", err);
            if let Some(hint) = commands::suggestion_for(&err) {
                eprintln!("   💡 {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_generate() {
        let cli = Cli::try_parse_from(["blogkit"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("blog.toml"));
    }

    #[test]
    fn test_posts_new_requires_title_and_content() {
        assert!(Cli::try_parse_from(["blogkit", "posts", "new", "--title", "T"]).is_err());
        let cli = Cli::try_parse_from([
            "blogkit", "posts", "new", "--title", "T", "--content", "body.html", "--publish",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Posts {
                command: PostsCommand::New { publish, slug, .. },
            }) => {
                assert!(publish);
                assert!(slug.is_none());
            }
            _ => panic!("expected posts new"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["blogkit", "validate", "--config", "site/blog.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("site/blog.toml"));
        assert!(matches!(cli.command, Some(Command::Validate)));
    }
}
