//! Interactive command shell and the one-shot command runner.
//!
//! Every screen-like command (`go`, `projects`, `photos`) goes through
//! `PhotoDesk::navigate`, so the navigation guard decides what is shown.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Result};
use photodesk_core::models::{ItemCreate, ItemUpdate, Photo, Project, ProjectCreate};
use photodesk_core::utils::{format_date, plural, truncate};
use photodesk_core::{ApiError, AppError, PhotoDesk, View, Visit};
use tracing::{debug, warn};

// ============================================================================
// Constants
// ============================================================================

/// Column width for names and titles in listings.
const NAME_WIDTH: usize = 32;

/// Column width for descriptions in listings.
const DESCRIPTION_WIDTH: usize = 40;

/// Command name, synopsis and summary, in the order `help` prints them.
const USAGE: &[(&str, &str, &str)] = &[
    ("login", "login [email]", "Log in (password is prompted)"),
    ("register", "register <name> <email>", "Create an account and log in"),
    ("logout", "logout", "End the session"),
    ("whoami", "whoami", "Show the logged-in user"),
    ("go", "go <path>", "Navigate, e.g. `go /projects/<id>`"),
    ("where", "where", "Show the current location"),
    ("projects", "projects", "List projects"),
    ("project", "project new <name> [description]", "Create a project"),
    ("project", "project rm <id>", "Delete a project"),
    ("photos", "photos <project>", "Open a project workspace"),
    ("upload", "upload <project> <file>...", "Upload photos"),
    ("photo", "photo rm <project> <id>...", "Delete photos"),
    ("photo", "photo url <project> <id>", "Print a photo's URL"),
    ("photo", "photo save <project> <id> [file]", "Download a photo"),
    ("items", "items", "List items"),
    ("item", "item new <title> [description]", "Create an item"),
    ("item", "item set <id> <title> [description]", "Update an item's title (and description)"),
    ("item", "item rm <id>", "Delete an item"),
    ("help", "help", "Show this list"),
    ("quit", "quit", "Leave the shell"),
];

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: Option<String> },
    Register { name: String, email: String },
    Logout,
    Whoami,
    Go { path: String },
    Where,
    Projects,
    ProjectNew { name: String, description: Option<String> },
    ProjectRm { id: String },
    Photos { project: String },
    Upload { project: String, files: Vec<PathBuf> },
    PhotoRm { project: String, ids: Vec<String> },
    PhotoUrl { project: String, id: String },
    PhotoSave { project: String, id: String, dest: Option<PathBuf> },
    Items,
    ItemNew { title: String, description: Option<String> },
    ItemSet { id: i64, title: String, description: Option<String> },
    ItemRm { id: i64 },
    Help,
    Quit,
}

fn usage_for(name: &str) -> String {
    let lines: Vec<&str> = USAGE
        .iter()
        .filter(|(n, _, _)| *n == name)
        .map(|(_, synopsis, _)| *synopsis)
        .collect();
    format!("Usage: {}", lines.join("\n       "))
}

fn parse_item_id(raw: &str) -> Result<i64> {
    match raw.parse() {
        Ok(id) => Ok(id),
        Err(_) => bail!("Item id must be a number, got '{}'", raw),
    }
}

impl Command {
    /// Parse a split command line (see `split_args`).
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((head, rest)) = args.split_first() else {
            bail!("Empty command");
        };

        let command = match (head.as_str(), rest) {
            ("login", []) => Command::Login { email: None },
            ("login", [email]) => Command::Login {
                email: Some(email.clone()),
            },
            ("register", [name, email]) => Command::Register {
                name: name.clone(),
                email: email.clone(),
            },
            ("logout", []) => Command::Logout,
            ("whoami", []) => Command::Whoami,
            ("go", [path]) => Command::Go { path: path.clone() },
            ("where", []) => Command::Where,
            ("projects", []) => Command::Projects,
            ("project", [sub, tail @ ..]) => match (sub.as_str(), tail) {
                ("new", [name]) => Command::ProjectNew {
                    name: name.clone(),
                    description: None,
                },
                ("new", [name, description]) => Command::ProjectNew {
                    name: name.clone(),
                    description: Some(description.clone()),
                },
                ("rm", [id]) => Command::ProjectRm { id: id.clone() },
                _ => bail!(usage_for("project")),
            },
            ("photos", [project]) => Command::Photos {
                project: project.clone(),
            },
            ("upload", [project, files @ ..]) if !files.is_empty() => Command::Upload {
                project: project.clone(),
                files: files.iter().map(PathBuf::from).collect(),
            },
            ("photo", [sub, tail @ ..]) => match (sub.as_str(), tail) {
                ("rm", [project, ids @ ..]) if !ids.is_empty() => Command::PhotoRm {
                    project: project.clone(),
                    ids: ids.to_vec(),
                },
                ("url", [project, id]) => Command::PhotoUrl {
                    project: project.clone(),
                    id: id.clone(),
                },
                ("save", [project, id]) => Command::PhotoSave {
                    project: project.clone(),
                    id: id.clone(),
                    dest: None,
                },
                ("save", [project, id, dest]) => Command::PhotoSave {
                    project: project.clone(),
                    id: id.clone(),
                    dest: Some(PathBuf::from(dest)),
                },
                _ => bail!(usage_for("photo")),
            },
            ("items", []) => Command::Items,
            ("item", [sub, tail @ ..]) => match (sub.as_str(), tail) {
                ("new", [title]) => Command::ItemNew {
                    title: title.clone(),
                    description: None,
                },
                ("new", [title, description]) => Command::ItemNew {
                    title: title.clone(),
                    description: Some(description.clone()),
                },
                ("set", [id, title]) => Command::ItemSet {
                    id: parse_item_id(id)?,
                    title: title.clone(),
                    description: None,
                },
                ("set", [id, title, description]) => Command::ItemSet {
                    id: parse_item_id(id)?,
                    title: title.clone(),
                    description: Some(description.clone()),
                },
                ("rm", [id]) => Command::ItemRm {
                    id: parse_item_id(id)?,
                },
                _ => bail!(usage_for("item")),
            },
            ("help" | "?" | "-h" | "--help", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            (name, _) if USAGE.iter().any(|(n, _, _)| *n == name) => bail!(usage_for(name)),
            (name, _) => bail!("Unknown command '{}'. Type `help` for a list.", name),
        };
        Ok(command)
    }
}

/// Split a command line into arguments. Single and double quotes group
/// words; a backslash escapes the next character outside single quotes.
pub fn split_args(line: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some('"') if c == '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            Some(_) => current.push(c),
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    in_token = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                        in_token = true;
                    }
                }
                c if c.is_whitespace() => {
                    if in_token {
                        args.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if quote.is_some() {
        bail!("Unterminated quote");
    }
    if in_token {
        args.push(current);
    }
    Ok(args)
}

// ============================================================================
// Terminal input
// ============================================================================

fn input_error(e: io::Error) -> AppError {
    AppError::InvalidInput(format!("Could not read input: {}", e))
}

/// Prompt for a line; an empty answer takes `default` when there is one.
fn prompt_line(label: &str, default: Option<&str>) -> Result<String, AppError> {
    match default {
        Some(d) => print!("{} [{}]: ", label, d),
        None => print!("{}: ", label),
    }
    io::stdout().flush().map_err(input_error)?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).map_err(input_error)?;
    let answer = line.trim();
    match (answer.is_empty(), default) {
        (true, Some(d)) => Ok(d.to_string()),
        _ => Ok(answer.to_string()),
    }
}

fn prompt_password(label: &str) -> Result<String, AppError> {
    rpassword::prompt_password(format!("{}: ", label)).map_err(input_error)
}

// ============================================================================
// Shell
// ============================================================================

pub enum Flow {
    Continue,
    Quit,
}

pub struct Shell {
    desk: PhotoDesk,
    /// Re-render the current location after session changes.
    interactive: bool,
}

impl Shell {
    pub fn new(desk: PhotoDesk, interactive: bool) -> Self {
        Self { desk, interactive }
    }

    fn prompt(&self) -> String {
        match self.desk.current() {
            Some(location) => format!("photodesk:{}> ", location.path),
            None => "photodesk> ".to_string(),
        }
    }

    /// Read-eval loop until `quit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        if self.desk.is_authenticated() {
            if let Err(e) = self.desk.restore_user().await {
                warn!(error = %e, "Could not restore profile");
            }
        }
        println!("photodesk - type `help` for commands");
        if let Err(e) = self.go("/").await {
            self.report(e).await;
        }

        let stdin = io::stdin();
        loop {
            print!("{}", self.prompt());
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                println!();
                break;
            }

            let command = match split_args(&line).and_then(|args| {
                if args.is_empty() {
                    Ok(None)
                } else {
                    Command::parse(&args).map(Some)
                }
            }) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    eprintln!("{}", e);
                    continue;
                }
            };

            debug!(?command, "Executing");
            match self.execute(command).await {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => self.report(e).await,
            }
        }
        Ok(())
    }

    /// Print a failed command. An expired session re-renders the current
    /// location, which now lands on the login screen.
    async fn report(&mut self, error: AppError) {
        eprintln!("Error: {}", error.user_message());
        if matches!(&error, AppError::Api(e) if e.is_unauthorized()) && self.interactive {
            if let Err(e) = self.refresh().await {
                eprintln!("Error: {}", e.user_message());
            }
        }
    }

    fn require_session(&self) -> Result<(), AppError> {
        if self.desk.is_authenticated() {
            Ok(())
        } else {
            Err(AppError::InvalidInput("Not logged in. Use `login` first.".to_string()))
        }
    }

    async fn go(&mut self, path: &str) -> Result<(), AppError> {
        let visit = self.desk.navigate(path).await?;
        render(&visit);
        Ok(())
    }

    /// Navigate to the current location again (or `/`).
    async fn refresh(&mut self) -> Result<(), AppError> {
        let path = self
            .desk
            .current()
            .map(|l| l.path.clone())
            .unwrap_or_else(|| "/".to_string());
        self.go(&path).await
    }

    fn remember_email(&mut self, email: &str) {
        let config = self.desk.config_mut();
        if config.last_email.as_deref() == Some(email) {
            return;
        }
        config.last_email = Some(email.to_string());
        if let Err(e) = self.desk.config().save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    pub async fn execute(&mut self, command: Command) -> Result<Flow, AppError> {
        match command {
            Command::Login { email } => {
                let email = match email {
                    Some(email) => email,
                    None => {
                        let last = self.desk.config().last_email.clone();
                        prompt_line("Email", last.as_deref())?
                    }
                };
                let password = prompt_password("Password")?;
                let user = self.desk.login(&email, &password).await?;
                println!("Logged in as {} <{}>", user.name, user.email);
                self.remember_email(&email);
                if self.interactive {
                    self.refresh().await?;
                }
            }

            Command::Register { name, email } => {
                let password = prompt_password("Password")?;
                let confirm = prompt_password("Confirm password")?;
                if password != confirm {
                    return Err(AppError::InvalidInput("Passwords do not match".to_string()));
                }
                let user = self.desk.register(&name, &email, &password).await?;
                println!("Welcome, {}. You are logged in.", user.name);
                self.remember_email(&email);
                if self.interactive {
                    self.refresh().await?;
                }
            }

            Command::Logout => {
                self.desk.logout();
                println!("Logged out");
                if self.interactive {
                    self.refresh().await?;
                }
            }

            Command::Whoami => match self.desk.restore_user().await? {
                Some(user) => println!("{} <{}> (id {})", user.name, user.email, user.id),
                None => println!("Not logged in"),
            },

            Command::Go { path } => self.go(&path).await?,

            Command::Where => match self.desk.current() {
                Some(location) => println!("{}", location.path),
                None => println!("(nowhere yet)"),
            },

            Command::Projects => self.go("/projects").await?,

            Command::ProjectNew { name, description } => {
                self.require_session()?;
                let data = ProjectCreate {
                    name,
                    description: description.filter(|d| !d.trim().is_empty()),
                };
                let project = self.desk.api().create_project(&data).await?;
                println!("Created project {} ({})", project.name, project.id);
            }

            Command::ProjectRm { id } => {
                self.require_session()?;
                self.desk.api().delete_project(&id).await?;
                println!("Deleted project {}", id);
            }

            Command::Photos { project } => self.go(&format!("/projects/{}", project)).await?,

            Command::Upload { project, files } => {
                self.require_session()?;
                let ids = self.desk.upload_files(&project, &files).await?;
                println!("Uploaded {}", plural(ids.len() as u64, "photo"));
                for id in ids {
                    println!("  {}", id);
                }
            }

            Command::PhotoRm { project, ids } => {
                self.require_session()?;
                let mut unauthorized: Option<ApiError> = None;
                for (id, result) in self.desk.delete_photos(&project, &ids).await {
                    match result {
                        Ok(()) => println!("Deleted {}", id),
                        Err(e) => {
                            eprintln!("Could not delete {}: {}", id, e);
                            if e.is_unauthorized() {
                                unauthorized = Some(e);
                            }
                        }
                    }
                }
                if let Some(e) = unauthorized {
                    return Err(e.into());
                }
            }

            Command::PhotoUrl { project, id } => {
                println!("{}", self.desk.api().photo_url(&project, &id));
            }

            Command::PhotoSave { project, id, dest } => {
                self.require_session()?;
                let dest = dest.unwrap_or_else(|| PathBuf::from(&id));
                let written = self.desk.save_photo(&project, &id, &dest).await?;
                println!("Saved {} bytes to {}", written, dest.display());
            }

            Command::Items => {
                self.require_session()?;
                let items = self.desk.api().list_items().await?;
                if items.is_empty() {
                    println!("No items yet. Create one with `item new <title>`.");
                }
                for item in items {
                    println!(
                        "{:>6}  {:<width$}  {}",
                        item.id,
                        truncate(&item.title, NAME_WIDTH),
                        truncate(&item.description, DESCRIPTION_WIDTH),
                        width = NAME_WIDTH
                    );
                }
            }

            Command::ItemNew { title, description } => {
                self.require_session()?;
                let item = self
                    .desk
                    .api()
                    .create_item(&ItemCreate { title, description })
                    .await?;
                println!("Created item {}", item.id);
            }

            Command::ItemSet { id, title, description } => {
                self.require_session()?;
                let update = ItemUpdate {
                    title: Some(title),
                    description,
                };
                let item = self.desk.api().update_item(id, &update).await?;
                println!("Updated item {}: {}", item.id, item.title);
            }

            Command::ItemRm { id } => {
                self.require_session()?;
                self.desk.api().delete_item(id).await?;
                println!("Deleted item {}", id);
            }

            Command::Help => {
                for (_, synopsis, summary) in USAGE {
                    println!("  {:<38}{}", synopsis, summary);
                }
            }

            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn render(visit: &Visit) {
    let navigation = &visit.navigation;
    if navigation.redirected() {
        println!("[{} -> {}]", navigation.requested, navigation.location.path);
    }

    match &visit.view {
        View::Login => {
            println!("Log in with `login [email]`, or create an account with `register <name> <email>`.")
        }
        View::Register => println!("Create an account with `register <name> <email>`."),
        View::Projects(projects) => render_projects(projects),
        View::Workspace { project, photos } => render_workspace(project, photos),
        View::NotFound => println!("Nothing at {}", navigation.location.path),
    }
}

fn render_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("No projects yet. Create one with `project new <name>`.");
        return;
    }
    for project in projects {
        println!(
            "{}  {:<width$}  {:<12}  {}  {}",
            project.id,
            truncate(&project.name, NAME_WIDTH),
            project
                .photo_count
                .map(|n| plural(n, "photo"))
                .unwrap_or_default(),
            format_date(&project.created_at),
            truncate(project.description_display(), DESCRIPTION_WIDTH),
            width = NAME_WIDTH
        );
    }
}

fn render_workspace(project: &Project, photos: &[Photo]) {
    println!("{} ({})", project.name, plural(photos.len() as u64, "photo"));
    if !project.description_display().is_empty() {
        println!("{}", project.description_display());
    }
    for photo in photos {
        println!(
            "  {}  {:<width$}  {:>9}  {}",
            photo.id,
            truncate(&photo.original_name, NAME_WIDTH),
            photo.size_display(),
            format_date(&photo.created_at),
            width = NAME_WIDTH
        );
    }
}
