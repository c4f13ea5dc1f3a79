//! quire - command-line front end for the poem site
//!
//! Reads go through the public raw mirror and need no credentials. Writes
//! (`add`, `edit`, `delete`) need an access token stored with `quire login`.
//!
//! Rendered output goes to stdout; logs go to stderr.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use quire_common::config::{
    default_config_path, load_toml_config, write_toml_config, ConfigOverrides, SiteConfig,
    TomlConfig,
};
use quire_common::prefs::FilePreferences;
use quire_site::render::{html, text};
use quire_site::view::Filter;
use quire_site::{AppState, GitHubStore, SiteError};
use tracing::{debug, info};

/// Command-line arguments for quire
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(about = "Publish, edit and browse poems kept in a hosted repository")]
#[command(version)]
struct Args {
    /// Config file (default: platform config dir/quire/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Repository owner
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Repository name
    #[arg(long, global = true)]
    repo: Option<String>,

    /// Branch holding the poem document
    #[arg(long, global = true)]
    branch: Option<String>,

    /// Path of the poem document inside the repository
    #[arg(long, global = true)]
    path: Option<String>,

    /// Network timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Poems revealed per page
    #[arg(long, global = true)]
    page_size: Option<usize>,

    /// Directory for preferences and the session file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the repository settings given on the command line to the config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// List poems, newest first
    List {
        /// Only poems carrying this tag (exact match)
        #[arg(long, conflicts_with_all = ["search", "favorites"])]
        tag: Option<String>,

        /// Only poems whose title or content contains this text (any case)
        #[arg(long, conflicts_with = "favorites")]
        search: Option<String>,

        /// Only favorite poems
        #[arg(long)]
        favorites: bool,

        /// Reveal this many pages
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Emit HTML fragments instead of plain text
        #[arg(long)]
        html: bool,
    },

    /// Show one poem in full
    Show {
        id: String,

        #[arg(long)]
        html: bool,
    },

    /// List tags with their poem counts
    Tags {
        #[arg(long)]
        html: bool,
    },

    /// Store an access token for writing
    Login {
        /// Access token (read from stdin when omitted)
        #[arg(env = "QUIRE_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Forget the stored access token
    Logout,

    /// Add a new poem
    Add {
        #[arg(long)]
        title: String,

        /// Poem text
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,

        /// Read the poem text from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },

    /// Change an existing poem; fields not given are kept
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, conflicts_with = "file")]
        content: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,

        /// Comma-separated tags (replaces all tags)
        #[arg(long)]
        tags: Option<String>,
    },

    /// Delete a poem
    Delete { id: String },

    /// Mark or unmark a poem as favorite
    Favorite { id: String },
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            branch: self.branch.clone(),
            path: self.path.clone(),
            timeout_secs: self.timeout,
            page_size: self.page_size,
            data_dir: self.data_dir.clone(),
        }
    }
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn log_build_info() {
    debug!(
        "quire v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("QUIRE_GIT_HASH"),
        env!("QUIRE_BUILD_TIMESTAMP"),
        env!("QUIRE_BUILD_PROFILE")
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let toml_config = match &config_path {
        Some(path) if path.exists() => load_toml_config(path)?,
        _ => TomlConfig::default(),
    };

    if let Command::Init { force } = &args.command {
        init_tracing(&toml_config.logging.level);
        log_build_info();
        let path = config_path.context("No config directory on this platform; pass --config")?;
        return init_config(&args, &path, *force);
    }

    let config = SiteConfig::resolve(&args.overrides(), &toml_config)?;
    init_tracing(&config.log_level);
    log_build_info();

    debug!(
        owner = %config.owner,
        repo = %config.repo,
        branch = %config.branch,
        path = %config.path,
        data_dir = %config.data_dir.display(),
        "Configuration resolved"
    );

    let store = Arc::new(GitHubStore::new(&config)?);
    let preferences = FilePreferences::open(config.preferences_path())?;
    let session_store = FilePreferences::open(config.session_path())?;
    let mut app = AppState::initialize(&config, store, Box::new(preferences), Box::new(session_store));

    run(&mut app, args.command).await
}

fn init_config(args: &Args, path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if args.owner.is_none() || args.repo.is_none() {
        bail!("init needs at least --owner and --repo");
    }

    let config = TomlConfig {
        owner: args.owner.clone(),
        repo: args.repo.clone(),
        branch: args.branch.clone(),
        path: args.path.clone(),
        timeout_secs: args.timeout,
        page_size: args.page_size,
        data_dir: args.data_dir.clone(),
        ..TomlConfig::default()
    };
    write_toml_config(&config, path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn run(app: &mut AppState, command: Command) -> Result<()> {
    let mut out = io::stdout().lock();

    match command {
        Command::Init { .. } => unreachable!("init is handled before the store is built"),

        Command::List {
            tag,
            search,
            favorites,
            page,
            html: as_html,
        } => {
            app.refresh(false).await?;
            if favorites {
                app.show_favorites();
            } else if let Some(tag) = tag {
                app.select_filter(Filter::Tag(tag));
            } else if let Some(term) = search {
                app.select_filter(Filter::Search(term));
            }
            app.set_page(page);

            let view = app.current_page();
            if as_html {
                let active = match app.view().filter() {
                    Filter::Tag(name) => Some(name.as_str()),
                    _ => None,
                };
                writeln!(out, "{}", html::render_tag_filters(&app.tag_summary(), active))?;
                writeln!(out, "{}", html::render_page(&view, |id| app.is_favorite(id)))?;
            } else {
                write!(out, "{}", text::render_page(&view, |id| app.is_favorite(id)))?;
            }
        }

        Command::Show { id, html: as_html } => {
            app.refresh(false).await?;
            let poem = app
                .find(&id)
                .ok_or_else(|| SiteError::NotFound(format!("poem {}", id)))?;
            let favorite = app.is_favorite(&poem.id);
            if as_html {
                writeln!(
                    out,
                    r#"<article class="poem" data-id="{}"><h2>{}</h2><div class="poem-body">{}</div></article>"#,
                    html::escape_html(&poem.id),
                    html::escape_html(&poem.title),
                    html::render_body(&poem.content)
                )?;
            } else {
                write!(out, "{}", text::render_poem(poem, favorite))?;
            }
        }

        Command::Tags { html: as_html } => {
            app.refresh(false).await?;
            let summary = app.tag_summary();
            if as_html {
                writeln!(out, "{}", html::render_tag_filters(&summary, None))?;
            } else {
                write!(out, "{}", text::render_tags(&summary, app.latest_update()))?;
            }
        }

        Command::Login { token } => {
            let token = match token {
                Some(token) => token,
                None => read_token()?,
            };
            app.login(&token)?;
            writeln!(out, "Logged in.")?;
        }

        Command::Logout => {
            app.logout()?;
            writeln!(out, "Logged out.")?;
        }

        Command::Add {
            title,
            content,
            file,
            tags,
        } => {
            let content = match read_content(content, file)? {
                Some(content) => content,
                None => bail!("add needs --content or --file"),
            };
            let editor = app.editor_mut();
            editor.set_title(title);
            editor.set_content(content);
            if let Some(tags) = tags {
                editor.set_tags_text(&tags);
            }
            let saved = app.save_draft().await?;
            writeln!(out, "Added poem {} ({})", saved.id, saved.title)?;
        }

        Command::Edit {
            id,
            title,
            content,
            file,
            tags,
        } => {
            app.refresh(false).await?;
            app.begin_edit(&id)?;
            let content = read_content(content, file)?;
            let editor = app.editor_mut();
            if let Some(title) = title {
                editor.set_title(title);
            }
            if let Some(content) = content {
                editor.set_content(content);
            }
            if let Some(tags) = tags {
                editor.set_tags_text(&tags);
            }
            let saved = app.save_draft().await?;
            writeln!(out, "Updated poem {} ({})", saved.id, saved.title)?;
        }

        Command::Delete { id } => {
            app.refresh(false).await?;
            let removed = app.delete(&id).await?;
            writeln!(out, "Deleted poem {} ({})", removed.id, removed.title)?;
        }

        Command::Favorite { id } => {
            app.refresh(false).await?;
            if app.find(&id).is_none() {
                return Err(SiteError::NotFound(format!("poem {}", id)).into());
            }
            let now_favorite = app.toggle_favorite(&id)?;
            info!(%id, now_favorite, "Favorite toggled");
            writeln!(
                out,
                "{} poem {}",
                if now_favorite { "Favorited" } else { "Unfavorited" },
                id
            )?;
        }
    }

    Ok(())
}

fn read_content(content: Option<String>, file: Option<PathBuf>) -> Result<Option<String>> {
    match (content, file) {
        (Some(content), _) => Ok(Some(content)),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .map(Some)
            .with_context(|| format!("Failed to read {}", path.display())),
        (None, None) => Ok(None),
    }
}

fn read_token() -> Result<String> {
    eprint!("Access token: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read access token")?;
    Ok(line)
}
