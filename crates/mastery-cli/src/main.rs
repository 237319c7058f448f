//! Mastery CLI - knowledge graphs and adaptive quizzes from the terminal

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use mastery_core::api::HttpApi;
use mastery_core::cache::QueryCache;
use mastery_core::config::Config;
use mastery_core::domain::{AnswerDetail, QuestionBody, SubmissionResult};
use mastery_core::graph::AssembledGraph;
use mastery_core::session::{ActiveQuestion, QuestionSession, SlotState, SubmitOutcome};
use mastery_core::LearningClient;
use serde::Serialize;
use tracing::debug;

#[derive(Parser)]
#[command(name = "mastery")]
#[command(author, version, about = "Browse knowledge graphs and practice adaptive quizzes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// API base URL, overriding the config file and MASTERY_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse and enroll in courses
    Courses {
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// Browse and enroll in knowledge graph templates
    Graphs {
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// Show a knowledge graph with mastery levels
    Knowledge {
        /// Graph ID
        graph_id: String,
        /// Print the render-ready {nodes, links} JSON
        #[arg(long)]
        json: bool,
    },

    /// Practice adaptive questions for a graph
    Quiz {
        /// Graph ID
        graph_id: String,
        /// Use the owner route instead of the enrolled-learner route
        #[arg(long)]
        owner: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List all entries
    List,
    /// Show entry details
    Show { id: String },
    /// Enroll in an entry
    Enroll { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mastery=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        report(&err);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let api_url = cli.api_url.as_deref();

    match cli.command {
        Commands::Courses { action } => {
            let client = build_client(api_url)?;
            cmd_courses(&client, action, cli.format, cli.quiet).await
        }

        Commands::Graphs { action } => {
            let client = build_client(api_url)?;
            cmd_graphs(&client, action, cli.format, cli.quiet).await
        }

        Commands::Knowledge { graph_id, json } => {
            let client = build_client(api_url)?;
            let format = if json { OutputFormat::Json } else { cli.format };
            cmd_knowledge(&client, &graph_id, format, cli.quiet).await
        }

        Commands::Quiz { graph_id, owner } => {
            let client = build_client(api_url)?;
            cmd_quiz(client, &graph_id, owner, cli.quiet).await
        }

        Commands::Config { action } => cmd_config(action, cli.quiet),
    }
}

/// Print an error with its code and suggestion when it came from the core library
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<mastery_core::Error>() {
        Some(core) => {
            eprintln!("Error [{}]: {}", core.code(), core);
            if let Some(suggestion) = core.suggestion() {
                eprintln!("  Try: {}", suggestion);
            }
        }
        None => eprintln!("Error: {:#}", err),
    }
}

fn build_client(api_url: Option<&str>) -> anyhow::Result<LearningClient<HttpApi>> {
    let config = Config::load()?;

    let api = match api_url {
        Some(url) => HttpApi::builder()
            .base_url(url)
            .timeout(config.api.timeout())
            .build()?,
        None => HttpApi::new(&config.api)?,
    };
    debug!(base_url = %api.base_url(), "Using learning API");

    Ok(LearningClient::new(api, QueryCache::from_config(&config.cache)))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Command Implementations
// ============================================================================

fn enrolled_marker(is_enrolled: bool) -> &'static str {
    if is_enrolled { " [enrolled]" } else { "" }
}

async fn cmd_courses(
    client: &LearningClient<HttpApi>,
    action: CatalogAction,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    match action {
        CatalogAction::List => {
            let courses = client.courses().await?;
            if format == OutputFormat::Json {
                return print_json(&courses);
            }
            if courses.is_empty() {
                if !quiet {
                    println!("No courses found.");
                }
            } else {
                if !quiet {
                    println!("Courses:");
                }
                for c in courses {
                    println!(
                        "  {} - {} ({} nodes){}",
                        c.id,
                        c.name,
                        c.node_count,
                        enrolled_marker(c.is_enrolled)
                    );
                }
            }
        }
        CatalogAction::Show { id } => {
            let course = client.course(&id).await?;
            if format == OutputFormat::Json {
                return print_json(&course);
            }
            println!("Course: {}", course.name);
            println!("  ID: {}", course.id);
            println!("  Nodes: {}", course.node_count);
            println!("  Enrolled: {}", if course.is_enrolled { "yes" } else { "no" });
            if course.is_primary {
                println!("  Primary: yes");
            }
        }
        CatalogAction::Enroll { id } => {
            let course = client.course(&id).await?;
            if course.is_enrolled {
                if !quiet {
                    println!("Already enrolled in '{}'.", course.name);
                }
                return Ok(());
            }

            client.enroll_course(&id).await?;
            // Served from the patched cache entry
            let course = client.course(&id).await?;
            if format == OutputFormat::Json {
                return print_json(&course);
            }
            if !quiet {
                println!("Enrolled in '{}'.", course.name);
                println!("\nList its graphs with: mastery graphs list");
            }
        }
    }
    Ok(())
}

async fn cmd_graphs(
    client: &LearningClient<HttpApi>,
    action: CatalogAction,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    match action {
        CatalogAction::List => {
            let graphs = client.graph_templates().await?;
            if format == OutputFormat::Json {
                return print_json(&graphs);
            }
            if graphs.is_empty() {
                if !quiet {
                    println!("No graph templates found.");
                }
            } else {
                if !quiet {
                    println!("Graph templates:");
                }
                for g in graphs {
                    println!(
                        "  {} - {} ({} nodes){}",
                        g.id,
                        g.name,
                        g.node_count,
                        enrolled_marker(g.is_enrolled)
                    );
                }
            }
        }
        CatalogAction::Show { id } => {
            let graph = client.graph(&id).await?;
            if format == OutputFormat::Json {
                return print_json(&graph);
            }
            println!("Graph: {}", graph.name);
            println!("  ID: {}", graph.id);
            println!("  Nodes: {}", graph.node_count);
            println!("  Template: {}", if graph.is_primary { "yes" } else { "no" });
            println!("  Enrolled: {}", if graph.is_enrolled { "yes" } else { "no" });
        }
        CatalogAction::Enroll { id } => {
            let graph = client.graph(&id).await?;
            if graph.is_enrolled {
                if !quiet {
                    println!("Already enrolled in '{}'.", graph.name);
                }
                return Ok(());
            }

            client.enroll_graph(&id).await?;
            let graph = client.graph(&id).await?;
            if format == OutputFormat::Json {
                return print_json(&graph);
            }
            if !quiet {
                println!("Enrolled in '{}'.", graph.name);
                println!("\nStart practicing with: mastery quiz {}", graph.id);
            }
        }
    }
    Ok(())
}

async fn cmd_knowledge(
    client: &LearningClient<HttpApi>,
    graph_id: &str,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let graph = client.knowledge_graph(graph_id).await?;
    if format == OutputFormat::Json {
        return print_json(&graph);
    }
    print_knowledge_graph(&graph, quiet);
    Ok(())
}

fn print_knowledge_graph(graph: &AssembledGraph, quiet: bool) {
    if graph.nodes.is_empty() {
        if !quiet {
            println!("This graph has no nodes yet.");
        }
        return;
    }

    let stats = graph.stats();
    if !quiet {
        println!(
            "{} nodes, {} links (average mastery {:.0}%)",
            stats.node_count,
            stats.link_count,
            stats.average_mastery * 100.0
        );
        println!(
            "  low: {}  medium: {}  high: {}",
            stats.low, stats.medium, stats.high
        );
        if graph.dropped_edges > 0 {
            println!("  ({} edges skipped: endpoint not in graph)", graph.dropped_edges);
        }
        println!();
    }

    println!("Nodes:");
    for node in &graph.nodes {
        println!(
            "  {:<6} {:>4.0}%  {} ({})",
            node.level.as_str(),
            node.mastery_score * 100.0,
            node.name,
            node.id
        );
    }

    if !graph.links.is_empty() {
        println!("Links:");
        for link in &graph.links {
            println!("  {} -[{}]-> {}", link.source, link.edge_type, link.target);
        }
    }
}

// ========== Quiz ==========

const QUIZ_HELP: &str = "Type an answer (option number or letter for multiple choice), \
'next' for another question, or 'quit' to stop.";

async fn cmd_quiz(
    client: LearningClient<HttpApi>,
    graph_id: &str,
    owner: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    use rustyline::DefaultEditor;
    use rustyline::error::ReadlineError;

    let mut session = QuestionSession::new(client, graph_id, owner);
    let mut rl = DefaultEditor::new().map_err(|e| anyhow!("Failed to create editor: {}", e))?;

    if !quiet {
        println!("Practicing graph {} ({} route)", graph_id, session.route().as_str());
        println!("{}", QUIZ_HELP);
    }

    match session.fetch_next().await {
        Ok(state) => print_slot(state),
        Err(e) => eprintln!("Could not load a question: {}", e),
    }

    loop {
        let line = match rl.readline("answer> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        match input {
            "quit" | "exit" | "q" => break,
            "help" | "?" => println!("{}", QUIZ_HELP),
            "next" | "n" => match session.advance().await {
                Ok(state) => print_slot(state),
                Err(e) => eprintln!("Could not load a question: {}", e),
            },
            _ => match session.submit_input(input).await {
                Ok(SubmitOutcome::Accepted(result)) => {
                    if let SlotState::Submitted { detail, .. } = session.state() {
                        print_result(&result, detail);
                    }
                }
                Ok(SubmitOutcome::Ignored) => {
                    println!("No question is waiting for an answer. Type 'next' or 'quit'.");
                }
                Err(e) => eprintln!("{}", e),
            },
        }
    }

    let stats = session.stats();
    if !quiet {
        println!(
            "\nAnswered {} question(s), {} correct.",
            stats.answered, stats.correct
        );
    }
    Ok(())
}

fn print_slot(state: &SlotState) {
    match state {
        SlotState::Unanswered(active) => print_question(active),
        SlotState::Exhausted(selection) => {
            println!("\nNo question available right now.");
            if !selection.selection_reason.is_empty() {
                println!("  Reason: {}", selection.selection_reason);
            }
        }
        SlotState::Idle | SlotState::Submitted { .. } => {}
    }
}

fn print_question(active: &ActiveQuestion) {
    let question = &active.question;
    println!("\n[{}] {}", question.difficulty.as_str(), question.text);

    match &question.body {
        QuestionBody::MultipleChoice(mc) => {
            for (i, option) in mc.options.iter().enumerate() {
                println!("  {}. {}", i + 1, option);
            }
        }
        QuestionBody::FillInTheBlank(_) => println!("  (type the missing word or phrase)"),
        QuestionBody::Calculation(calc) => {
            println!("  (enter a number, {} decimal places)", calc.precision)
        }
    }

    debug!(
        node_id = ?active.node_id,
        reason = %active.selection_reason,
        priority = ?active.priority_score,
        "Question selected"
    );
}

fn print_result(result: &SubmissionResult, detail: &AnswerDetail) {
    println!("{}", if result.is_correct { "Correct!" } else { "Incorrect." });

    match detail {
        AnswerDetail::MultipleChoice { selected, correct } => {
            if let Some(selected) = selected {
                println!("  You chose: {}", selected);
            }
            if !result.is_correct
                && let Some(correct) = correct
            {
                println!("  Correct answer: {}", correct);
            }
        }
        AnswerDetail::FillInTheBlank {
            submitted,
            accepted,
        } => {
            println!("  You wrote: {}", submitted);
            if !result.is_correct && !accepted.is_empty() {
                println!("  Accepted answers: {}", accepted.join(", "));
            }
        }
        AnswerDetail::Calculation {
            submitted,
            expected,
            precision,
        } => {
            println!("  Your value: {} ({} decimal places)", submitted, precision);
            if !result.is_correct && !expected.is_empty() {
                println!("  Expected: {}", expected.join(" or "));
            }
        }
    }

    if let Some(feedback) = &result.feedback {
        println!("  {}", feedback);
    }
    if let Some(update) = &result.mastery_update {
        println!(
            "  Mastery of {} is now {:.0}%",
            update.node_id,
            update.mastery_score * 100.0
        );
    }
    println!("Type 'next' to continue.");
}

// ========== Config ==========

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
