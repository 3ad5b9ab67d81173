use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::sync::Arc;
use surveyctl::admin::{AdminSession, Outcome};
use surveyctl::auth::REVEAL_WINDOW;
use surveyctl::config::Config;
use surveyctl::editor::join_alternatives;
use surveyctl::logging;
use surveyctl::settings::Settings;
use surveyctl::store::graphql::GraphqlStore;

#[derive(Parser, Debug)]
#[command(name = "surveyctl")]
#[command(version = env!("SURVEYCTL_VERSION"))]
#[command(about = "Administer survey forms and questions on a remote survey store")]
struct Args {
    /// GraphQL endpoint of the survey store (overrides config)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Write debug lines to the log file
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List forms
    Forms,

    /// List questions
    Questions,

    /// Manage the stored authorization credential
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Edit an existing form and submit it
    Update {
        /// Id of the form to update
        form_id: String,

        /// New form name
        #[arg(long)]
        name: Option<String>,

        /// Replace a question's text (QUESTION_ID=TEXT)
        #[arg(long = "text", value_name = "ID=TEXT")]
        texts: Vec<String>,

        /// Replace a question's alternatives (QUESTION_ID=A|B|C)
        #[arg(long = "alternatives", value_name = "ID=A|B")]
        alternatives: Vec<String>,
    },

    /// Create a new form with fresh questions
    Create {
        /// Form name
        #[arg(long)]
        name: String,

        /// Question text (repeatable, kept in order)
        #[arg(long = "question", value_name = "TEXT")]
        questions: Vec<String>,
    },

    /// Flip the active flag of a form, by name
    Toggle {
        /// Form name; remembered for the next toggle
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum AuthAction {
    /// Store the credential sent with every write
    Set { token: String },

    /// Print the stored credential (masked)
    Show {
        /// Show the plain value briefly before masking it again
        #[arg(long)]
        reveal: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init();
    logging::set_trace(args.trace);

    let mut config = Config::load();
    if let Some(endpoint) = &args.endpoint {
        config.store.endpoint = endpoint.clone();
    }
    logging::cleanup_old_logs(config.logging.retain_days);
    logging::info(&format!(
        "surveyctl {} starting (endpoint: {})",
        env!("SURVEYCTL_VERSION"),
        config.store.endpoint
    ));

    if let Err(e) = run_main(args, config).await {
        logging::error(&format!("{:?}", e));
        return Err(e);
    }

    Ok(())
}

async fn run_main(args: Args, config: Config) -> Result<()> {
    let settings = Settings::load()?;

    match args.command {
        Command::Auth { action } => run_auth(action, settings).await?,
        Command::Forms => {
            let session = connect(&config, settings).await?;
            for form in &session.snapshot().forms {
                let state = if form.active { "active" } else { "inactive" };
                println!(
                    "{}  [{}]  {}  ({} questions)",
                    form.id,
                    state,
                    form.name,
                    form.questions.len()
                );
            }
        }
        Command::Questions => {
            let session = connect(&config, settings).await?;
            for question in &session.snapshot().questions {
                match &question.alternatives {
                    Some(alternatives) => println!(
                        "{}  {}  [{}]",
                        question.id,
                        question.text,
                        join_alternatives(Some(alternatives.as_slice()))
                    ),
                    None => println!("{}  {}", question.id, question.text),
                }
            }
        }
        Command::Update {
            form_id,
            name,
            texts,
            alternatives,
        } => {
            let mut session = connect(&config, settings).await?;
            let Some(editor) = session.editor_mut(&form_id) else {
                bail!("No form with id {}", form_id);
            };
            if let Some(name) = name {
                editor.set_name(&name);
            }
            for entry in &texts {
                let (id, text) = split_assignment(entry)?;
                editor.set_text(id, text)?;
            }
            for entry in &alternatives {
                let (id, raw) = split_assignment(entry)?;
                editor.set_alternatives(id, raw)?;
            }
            let outcome = session.submit_update(&form_id).await;
            report(&session, outcome, &format!("Updated form {}", form_id))?;
        }
        Command::Create { name, questions } => {
            let mut session = connect(&config, settings).await?;
            let draft = session.draft_mut();
            draft.set_name(&name);
            for text in &questions {
                draft.set_slot(draft.questions().len(), text)?;
            }
            let outcome = session.submit_create().await;
            report(&session, outcome, &format!("Created form \"{}\"", name))?;
        }
        Command::Toggle { name } => {
            let mut session = connect(&config, settings).await?;
            if let Some(name) = name {
                session.settings_mut().set_toggle_target(&name)?;
            }
            let target = session.settings().toggle_target().to_string();
            let outcome = session.toggle_active().await;
            let message = match session.snapshot().form_by_name(&target) {
                Some(form) if form.active => format!("Form \"{}\" is now active", target),
                Some(_) => format!("Form \"{}\" is now inactive", target),
                None => format!("Toggled form \"{}\"", target),
            };
            report(&session, outcome, &message)?;
        }
    }

    Ok(())
}

async fn connect(config: &Config, settings: Settings) -> Result<AdminSession> {
    let store = GraphqlStore::new(&config.store)?;
    let mut session = AdminSession::new(Arc::new(store), settings);
    session
        .refresh()
        .await
        .with_context(|| format!("Failed to load surveys from {}", config.store.endpoint))?;
    Ok(session)
}

async fn run_auth(action: AuthAction, mut settings: Settings) -> Result<()> {
    match action {
        AuthAction::Set { token } => {
            settings.set_authorization(&token)?;
            println!("Authorization stored");
        }
        AuthAction::Show { reveal } => {
            let credential = settings.authorization();
            if credential.is_empty() {
                println!("(no authorization stored)");
            } else if reveal {
                print!("{}", credential.as_str());
                io::stdout().flush()?;
                tokio::time::sleep(REVEAL_WINDOW).await;
                // Overwrite the plain value in place
                println!("\r\x1b[2K{}", credential.masked());
            } else {
                println!("{}", credential.masked());
            }
        }
    }
    Ok(())
}

fn split_assignment(entry: &str) -> Result<(&str, &str)> {
    match entry.split_once('=') {
        Some((id, value)) if !id.trim().is_empty() => Ok((id.trim(), value)),
        _ => bail!("Expected QUESTION_ID=VALUE, got {:?}", entry),
    }
}

fn report(session: &AdminSession, outcome: Outcome, success: &str) -> Result<()> {
    match outcome {
        Outcome::Completed => {
            println!("{}", success);
            Ok(())
        }
        Outcome::Blocked(reason) => {
            eprintln!("Nothing submitted: {}", reason.as_str());
            Ok(())
        }
        Outcome::Failed => {
            if let Some(rendered) = session.errors().render() {
                eprint!("{}", rendered);
            }
            bail!(
                "{}",
                session
                    .errors()
                    .headline()
                    .unwrap_or_else(|| "Submit failed".to_string())
            )
        }
    }
}
