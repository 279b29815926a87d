#![allow(clippy::print_stdout, clippy::print_stderr)]

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use notes_client_core::{
    ClientConfig, CredentialPresence, DispatchOutput, GateDecision, NavigationOutcome,
    NotesClient, OperationKind, OperationParams,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notes")]
#[command(about = "Notes client session and AI tools")]
pub struct NotesCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account; log in afterwards
    Signup(SignupArgs),
    /// Log in and store the session token
    Login(LoginArgs),
    /// Clear the local session and notify the service
    Logout,
    /// Show whether a session token is held
    Status,
    /// Check the held session token against the service
    Verify,
    /// Evaluate the route gate for a path
    Route(RouteArgs),
    /// Check whether the AI backend is reachable
    Probe,
    /// Run an AI operation on some text
    Ai(AiArgs),
}

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
}

#[derive(Args)]
pub struct SignupArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    /// Defaults to --password
    #[arg(long)]
    pub confirm_password: Option<String>,
}

impl SignupArgs {
    #[must_use]
    pub fn confirmation(&self) -> &str {
        self.confirm_password.as_deref().unwrap_or(&self.password)
    }
}

#[derive(Args)]
pub struct RouteArgs {
    pub path: String,
}

#[derive(Args)]
pub struct AiArgs {
    /// summarize, improve, key-points, change-tone, generate-tags, expand, translate
    pub operation: OperationKind,
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
    #[arg(long)]
    pub tone: Option<String>,
    #[arg(long)]
    pub language: Option<String>,
}

impl AiArgs {
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.text.join(" ")
    }

    #[must_use]
    pub fn params(&self) -> OperationParams {
        OperationParams {
            tone: self.tone.clone(),
            language: self.language.clone(),
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let cli = NotesCli::parse();
    init_tracing();

    let config = ClientConfig::from_env().context("resolve notes client configuration")?;
    let client = NotesClient::from_config(&config).context("build notes client")?;
    execute(&client, cli.command).await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn execute(client: &NotesClient, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Signup(args) => {
            client
                .session()
                .register(&args.name, &args.email, &args.password, args.confirmation())
                .await
                .context("signup failed")?;
            println!("account created; log in with `notes login --email {}`", args.email.trim());
        }
        Commands::Login(args) => {
            client
                .session()
                .login(&args.email, &args.password)
                .await
                .context("login failed")?;
            println!("logged in");
        }
        Commands::Logout => {
            client
                .session()
                .logout()
                .await
                .context("local session cleared; remote logout failed")?;
            println!("logged out");
        }
        Commands::Status => {
            let presence = client.credentials().current().presence();
            println!("session: {}", presence_label(presence));
            println!("session file: {}", client.config().session_file.display());
        }
        Commands::Verify => {
            let presence = client
                .session()
                .verify()
                .await
                .context("session check failed")?;
            println!("session: {}", presence_label(presence));
        }
        Commands::Route(args) => match client.navigator().navigate(&args.path).await {
            NavigationOutcome::Decided(decision) => {
                println!("{}", render_decision(&decision)?);
            }
            NavigationOutcome::Superseded => println!("superseded"),
        },
        Commands::Probe => {
            let availability = client.dispatcher().probe_availability().await;
            println!("ai backend: {}", availability.as_str());
        }
        Commands::Ai(args) => {
            let dispatcher = client.dispatcher();
            let availability = dispatcher.probe_availability().await;
            tracing::debug!(availability = availability.as_str(), "Startup probe finished");
            let output = dispatcher
                .dispatch(args.operation, &args.joined_text(), &args.params())
                .await
                .with_context(|| format!("{} failed", args.operation))?;
            print_output(&output);
        }
    }
    Ok(())
}

fn presence_label(presence: CredentialPresence) -> &'static str {
    match presence {
        CredentialPresence::Present => "present",
        CredentialPresence::Absent => "absent",
        CredentialPresence::Unknown => "checking",
    }
}

fn render_decision(decision: &GateDecision) -> anyhow::Result<String> {
    serde_json::to_string(decision).context("encode gate decision")
}

fn print_output(output: &DispatchOutput) {
    if output.is_placeholder() {
        eprintln!("AI backend unavailable; showing a local placeholder result");
    } else {
        eprintln!("{}", output.operation.kind().label());
    }
    println!("{}", output.text);
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use clap::error::ErrorKind;
    use notes_client_core::{GateDecision, OperationKind, Redirect};

    use super::{Commands, NotesCli, presence_label, render_decision};

    #[test]
    fn cli_requires_subcommand() {
        let err = match NotesCli::try_parse_from(["notes"]) {
            Ok(_) => panic!("expected missing subcommand parse error"),
            Err(err) => err,
        };
        assert_eq!(
            err.kind(),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn cli_rejects_unknown_subcommand() {
        let err = match NotesCli::try_parse_from(["notes", "unknown-subcommand"]) {
            Ok(_) => panic!("expected invalid subcommand parse error"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn ai_parses_operation_text_and_params() {
        let cli = NotesCli::try_parse_from([
            "notes",
            "ai",
            "change-tone",
            "please",
            "send",
            "the",
            "report",
            "--tone",
            "casual",
        ])
        .expect("parse ai command");
        let Commands::Ai(args) = cli.command else {
            panic!("expected ai command");
        };
        assert_eq!(args.operation, OperationKind::ChangeTone);
        assert_eq!(args.joined_text(), "please send the report");
        assert_eq!(args.params().tone.as_deref(), Some("casual"));
        assert_eq!(args.params().language, None);
    }

    #[test]
    fn ai_rejects_unknown_operation() {
        let err = match NotesCli::try_parse_from(["notes", "ai", "rhyme", "some text here"]) {
            Ok(_) => panic!("expected invalid operation"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn ai_requires_text() {
        let err = match NotesCli::try_parse_from(["notes", "ai", "summarize"]) {
            Ok(_) => panic!("expected missing text"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn signup_confirmation_defaults_to_password() {
        let cli = NotesCli::try_parse_from([
            "notes",
            "signup",
            "--name",
            "Ada",
            "--email",
            "ada@example.com",
            "--password",
            "pw",
        ])
        .expect("parse signup");
        let Commands::Signup(args) = cli.command else {
            panic!("expected signup command");
        };
        assert_eq!(args.name, "Ada");
        assert_eq!(args.confirmation(), "pw");

        let cli = NotesCli::try_parse_from([
            "notes",
            "signup",
            "--name",
            "Ada",
            "--email",
            "ada@example.com",
            "--password",
            "pw",
            "--confirm-password",
            "typo",
        ])
        .expect("parse signup");
        let Commands::Signup(args) = cli.command else {
            panic!("expected signup command");
        };
        assert_eq!(args.confirmation(), "typo");
    }

    #[test]
    fn signup_requires_name() {
        let err = match NotesCli::try_parse_from([
            "notes",
            "signup",
            "--email",
            "a@b.c",
            "--password",
            "pw",
        ]) {
            Ok(_) => panic!("expected missing name"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn login_requires_email_and_password() {
        let err = match NotesCli::try_parse_from(["notes", "login", "--email", "a@b.c"]) {
            Ok(_) => panic!("expected missing password"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn decisions_render_as_tagged_json() {
        let rendered = render_decision(&GateDecision::RedirectTo(Redirect {
            target: "/login".to_string(),
            return_path: Some("/notes".to_string()),
        }))
        .expect("render");
        assert_eq!(
            rendered,
            r#"{"decision":"redirect_to","target":"/login","return_path":"/notes"}"#
        );
        assert_eq!(
            presence_label(notes_client_core::CredentialPresence::Unknown),
            "checking"
        );
    }
}
