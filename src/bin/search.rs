//! Search binary entry point.
//!
//! This binary provides a command-line interface to the literature-search
//! service. It supports both single-query and interactive REPL modes, with
//! flexible output formatting (table or JSON).
//!
//! # Examples
//!
//! Single query with default settings:
//! ```bash
//! search --query "graph neural networks"
//! ```
//!
//! Open a shared results link and summarize the second hit:
//! ```bash
//! search --url "/search_result?title=attention&boolean_operator=AND&author=vaswani" --summarize 2
//! ```
//!
//! Interactive mode against a remote deployment:
//! ```bash
//! search --api-url https://papers.example.org/api --interactive
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use scholarly_search::{
    config::{parse_base_url, ClientConfig, OffsetBase},
    controller::{ResultPhase, SearchController, SearchView, SummaryPhase},
    models::{ArticleSummary, ResultPage},
    query::form::{simple_search, AdvancedSearchForm},
    query::{Prefix, QueryState, SortBy, SortOrder},
};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::form_urlencoded;

/// Output format for search results
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-friendly table
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Search binary CLI for the literature-search service
#[derive(Parser, Debug)]
#[command(
    name = "search",
    version,
    about = "Search research papers through the literature-search API",
    long_about = "Query the literature-search API, page through results and request \
                  per-paper summaries. Supports both single-query and interactive modes \
                  with flexible output formatting.

EXAMPLES:
  Single query:
    search --query \"graph neural networks\"

  Open a shared link on its page:
    search --url \"title=attention&boolean_operator=OR&author=hinton&page=3\"

  Summarize the first result as JSON:
    search --query \"diffusion models\" --summarize 1 --format json

  Interactive mode:
    search --interactive"
)]
struct Args {
    /// Base URL of the search API (overrides SCHOLARLY_API_URL)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Results per page (overrides SCHOLARLY_PAGE_SIZE)
    #[arg(long, value_name = "N")]
    page_size: Option<u32>,

    /// Whether the API counts `start` from 0 or 1 (overrides SCHOLARLY_OFFSET_BASE)
    #[arg(long, value_name = "0|1")]
    offset_base: Option<String>,

    /// Per-request timeout in seconds (overrides SCHOLARLY_TIMEOUT_SECS)
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Simple search text
    #[arg(long, value_name = "TEXT", conflicts_with_all = ["interactive", "url"])]
    query: Option<String>,

    /// Results-view link or bare query string to open
    #[arg(long, value_name = "LINK", conflicts_with = "interactive")]
    url: Option<String>,

    /// Summarize result N of the page after searching
    #[arg(long, value_name = "N")]
    summarize: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Enable interactive REPL mode
    #[arg(long, short = 'i')]
    interactive: bool,

    /// Logging verbosity level
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();
}

/// Environment settings with command-line overrides applied
fn build_config(args: &Args) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env().with_context(|| "Invalid environment configuration")?;

    if let Some(url) = &args.api_url {
        config.base_url = parse_base_url(url).with_context(|| "Invalid --api-url")?;
    }
    if let Some(size) = args.page_size {
        if size == 0 {
            anyhow::bail!("--page-size must be a positive integer");
        }
        config.page_size = size;
    }
    if let Some(base) = &args.offset_base {
        config.offset_base = base
            .parse::<OffsetBase>()
            .with_context(|| "Invalid --offset-base")?;
    }
    if let Some(secs) = args.timeout_secs {
        config.request_timeout = Some(Duration::from_secs(secs));
    }

    Ok(config)
}

/// Accept either a full results link or just its query string
fn query_part(link: &str) -> &str {
    match link.split_once('?') {
        Some((_, query)) => query,
        None => link,
    }
}

/// Error message followed by its causes
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }
    message
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Format a result page as a pretty table
fn format_results_table(page: &ResultPage) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Authors").add_attribute(Attribute::Bold),
        Cell::new("Published").add_attribute(Attribute::Bold),
        Cell::new("arXiv ID").add_attribute(Attribute::Bold),
    ]);

    for (idx, article) in page.items.iter().enumerate() {
        let id_cell = if article.pdf_link.is_none() {
            Cell::new(article.short_id()).fg(Color::DarkGrey)
        } else {
            Cell::new(article.short_id()).fg(Color::Cyan)
        };
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(truncate(&article.title, 60)),
            Cell::new(truncate(&article.author_names(), 40)),
            Cell::new(article.published_date()),
            id_cell,
        ]);
    }

    table.to_string()
}

/// Format the result slice of the view
fn format_results(view: &SearchView, format: OutputFormat) -> Result<String> {
    if let OutputFormat::Json = format {
        return match &view.result_phase {
            ResultPhase::Loaded(page) => serde_json::to_string_pretty(page)
                .with_context(|| "Failed to serialize results to JSON"),
            ResultPhase::Failed(e) => Ok(serde_json::json!({
                "status": "failed",
                "error": error_chain(&**e),
            })
            .to_string()),
            other => Ok(serde_json::json!({
                "status": other.name(),
                "total_count": other.total_count(),
            })
            .to_string()),
        };
    }

    Ok(match &view.result_phase {
        ResultPhase::Idle => "No search yet. Type a query or /help.".to_string(),
        ResultPhase::Loading => "Loading...".to_string(),
        ResultPhase::NoResults { total_count: 0 } => "No results found.".to_string(),
        ResultPhase::NoResults { total_count } => format!(
            "No results on page {} ({} matches over {} pages).",
            view.bounds.current, total_count, view.bounds.page_count
        ),
        ResultPhase::Failed(e) => format!(
            "Search failed: {}\nType /retry to try again.",
            error_chain(&**e)
        ),
        ResultPhase::Loaded(page) => format!(
            "{}\nPage {} of {} ({} results)",
            format_results_table(page),
            view.bounds.current,
            view.bounds.page_count,
            view.bounds.total_count
        ),
    })
}

/// Format the summary slice of the view
fn format_summary(phase: &SummaryPhase, format: OutputFormat) -> Result<String> {
    if let OutputFormat::Json = format {
        return match phase {
            SummaryPhase::Done(result) => serde_json::to_string_pretty(result)
                .with_context(|| "Failed to serialize summary to JSON"),
            SummaryPhase::Error { title, error } => Ok(serde_json::json!({
                "status": phase.status(),
                "document_title": title,
                "error": error_chain(&**error),
            })
            .to_string()),
            _ => Ok(serde_json::json!({
                "status": phase.status(),
                "document_title": phase.title(),
            })
            .to_string()),
        };
    }

    Ok(match phase {
        SummaryPhase::Ready => "No document selected.".to_string(),
        SummaryPhase::Generating { title } => format!("Generating summary for \"{}\"...", title),
        SummaryPhase::Error { title, error } => {
            format!("Failed to summarize \"{}\": {}", title, error_chain(&**error))
        }
        SummaryPhase::Done(result) => {
            let mut out = format!("{}\n{}\n", result.document_title, "═".repeat(80));
            for section in &result.sections {
                out.push_str(&format!("\n## {}\n{}\n", section.header, section.body));
            }
            out
        }
    })
}

/// Display detailed view of a single article
fn display_article_detail(article: &ArticleSummary, rank: usize) {
    println!("\n{}", "═".repeat(80));
    println!("Result: {}", rank);
    println!("Title: {}", article.title);
    println!("Authors: {}", article.author_names());
    println!("Published: {}", article.published_date());
    if let Some(updated) = article.updated_date() {
        println!("Updated: {}", updated);
    }
    println!("ID: {}", article.id);
    if let Some(pdf) = &article.pdf_link {
        println!("PDF: {}", pdf);
    }
    println!("\nAbstract:\n{}", article.abstract_text);
    println!("{}", "═".repeat(80));
}

/// Article at 1-based position `rank` of the loaded page
fn article_at(controller: &SearchController, rank: usize) -> Result<ArticleSummary> {
    let view = controller.current_view();
    let page = view
        .result_phase
        .page()
        .ok_or_else(|| anyhow::anyhow!("No results loaded"))?;
    if rank == 0 || rank > page.items.len() {
        anyhow::bail!(
            "Result {} out of range (page has {} results)",
            rank,
            page.items.len()
        );
    }
    Ok(page.items[rank - 1].clone())
}

/// Wait for in-flight fetches and print the results
async fn show_results(controller: &mut SearchController, format: OutputFormat) -> Result<()> {
    let start = Instant::now();
    let updates = controller.settle().await;
    debug!(?updates, elapsed_ms = start.elapsed().as_millis() as u64, "Settled");
    println!("{}", format_results(&controller.current_view(), format)?);
    Ok(())
}

/// Request a summary of result `rank` and print it
async fn summarize(controller: &mut SearchController, rank: usize, format: OutputFormat) -> Result<()> {
    let article = article_at(controller, rank)?;
    let pdf_link = article.pdf_link.as_deref().unwrap_or_default();
    if !controller.select_document(pdf_link, &article.title) {
        anyhow::bail!("Result {} has no PDF link to summarize", rank);
    }
    println!("{}", format_summary(&controller.current_view().summary_phase, format)?);

    controller.settle().await;
    println!("{}", format_summary(&controller.current_view().summary_phase, format)?);
    Ok(())
}

/// Fill the advanced form from `prefix1=title&keyword1=...` style input
fn advanced_from_form(input: &str) -> Result<QueryState> {
    let mut form = AdvancedSearchForm::default();
    for (name, value) in form_urlencoded::parse(input.as_bytes()) {
        form.set(&name, &value)?;
    }
    form.submit().map_err(Into::into)
}

fn print_help() {
    println!("Commands:");
    println!("  <text>               - Simple search across all fields");
    println!("  /advanced <form>     - Advanced search, e.g. keyword1=attention&prefix2=author&keyword2=vaswani");
    println!("  /open <link>         - Open a results link or query string");
    println!("  /page N              - Go to page N");
    println!("  /next, /prev         - Go to the next or previous page");
    println!("  /sort <by> [order]   - Sort by relevance|submittedDate|lastUpdatedDate, ascending|descending");
    println!("  /summarize N         - Summarize result N of the current page");
    println!("  /detail N            - Show full details for result N");
    println!("  /retry               - Repeat the last search");
    println!("  /link                - Print a shareable link for the current search");
    println!("  /format table|json   - Set output format");
    println!("  /help                - Show this help");
    println!("  Ctrl+D or Ctrl+C     - Exit");
    println!();
    println!(
        "Prefixes: {}",
        Prefix::VALUES
            .iter()
            .map(|p| format!("{} ({})", p.as_str(), p.label()))
            .collect::<Vec<_>>()
            .join(", ")
    );
}

/// Execute one REPL line
async fn handle_line(
    controller: &mut SearchController,
    line: &str,
    format: &mut OutputFormat,
) -> Result<()> {
    if !line.starts_with('/') {
        let state = simple_search(line).ok_or_else(|| anyhow::anyhow!("Empty query"))?;
        controller.set_search(state);
        return show_results(controller, *format).await;
    }

    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    let parts: Vec<&str> = rest.split_whitespace().collect();

    match command {
        "/help" => print_help(),
        "/advanced" => {
            controller.set_search(advanced_from_form(rest)?);
            show_results(controller, *format).await?;
        }
        "/open" => {
            let state = QueryState::parse(query_part(rest))?;
            controller.set_search_preserving_page(state);
            show_results(controller, *format).await?;
        }
        "/page" => {
            let &[n] = parts.as_slice() else {
                anyhow::bail!("Usage: /page N");
            };
            let n: i64 = n.parse().with_context(|| format!("Invalid page number: {}", n))?;
            controller.set_page(n)?;
            show_results(controller, *format).await?;
        }
        "/next" | "/prev" => {
            let bounds = controller.current_view().bounds;
            let target = if command == "/next" {
                if !bounds.has_next {
                    anyhow::bail!("Already on the last page");
                }
                i64::from(bounds.current) + 1
            } else {
                if !bounds.has_previous {
                    anyhow::bail!("Already on the first page");
                }
                i64::from(bounds.current) - 1
            };
            controller.set_page(target)?;
            show_results(controller, *format).await?;
        }
        "/sort" => {
            let (sort_by, sort_order) = match parts[..] {
                [by] => (by.parse::<SortBy>()?, SortOrder::default()),
                [by, order] => (by.parse::<SortBy>()?, order.parse::<SortOrder>()?),
                _ => anyhow::bail!("Usage: /sort <by> [order]"),
            };
            controller.set_sort(sort_by, sort_order)?;
            show_results(controller, *format).await?;
        }
        "/retry" => {
            controller.retry()?;
            show_results(controller, *format).await?;
        }
        "/summarize" | "/detail" => {
            let &[n] = parts.as_slice() else {
                anyhow::bail!("Usage: {} N", command);
            };
            let rank: usize = n.parse().with_context(|| format!("Invalid result number: {}", n))?;
            if command == "/detail" {
                display_article_detail(&article_at(controller, rank)?, rank);
            } else {
                summarize(controller, rank, *format).await?;
            }
        }
        "/link" => match controller.share_link() {
            Some(link) => println!("{}", link),
            None => anyhow::bail!("No search to link to"),
        },
        "/format" => match parts[..] {
            ["table"] => {
                *format = OutputFormat::Table;
                println!("Set output format to table");
            }
            ["json"] => {
                *format = OutputFormat::Json;
                println!("Set output format to JSON");
            }
            _ => anyhow::bail!("Usage: /format [table|json]"),
        },
        _ => anyhow::bail!("Unknown command: {}. Type /help for available commands.", command),
    }

    Ok(())
}

/// Run interactive REPL mode
async fn run_interactive(mut controller: SearchController, mut format: OutputFormat) -> Result<()> {
    println!("Interactive Paper Search");
    print_help();
    println!();

    let mut rl = DefaultEditor::new()
        .with_context(|| "Failed to create readline editor")?;

    loop {
        match rl.readline("Search> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)
                    .ok(); // Ignore errors from adding to history

                if let Err(e) = handle_line(&mut controller, line, &mut format).await {
                    eprintln!("{:#}", e);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                error!("Error reading input: {}", err);
                break;
            }
        }
    }

    Ok(())
}

/// Run single-query mode
async fn run_single_query(
    mut controller: SearchController,
    state: QueryState,
    preserve_page: bool,
    summarize_rank: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    info!("Searching: {}", state);
    if preserve_page {
        controller.set_search_preserving_page(state);
    } else {
        controller.set_search(state);
    }
    show_results(&mut controller, format).await?;

    if let ResultPhase::Failed(e) = &controller.current_view().result_phase {
        anyhow::bail!("Search failed: {}", error_chain(&**e));
    }

    if let Some(rank) = summarize_rank {
        summarize(&mut controller, rank, format).await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level);

    let config = build_config(&args)?;
    info!(
        "Using search API at {} (page size {}, offset base {:?})",
        config.base_url, config.page_size, config.offset_base
    );

    let controller = SearchController::from_config(config)
        .with_context(|| "Failed to create HTTP client")?;

    if args.interactive {
        return run_interactive(controller, args.format).await;
    }

    match (&args.query, &args.url) {
        (Some(text), _) => {
            let state = simple_search(text)
                .ok_or_else(|| anyhow::anyhow!("--query must not be blank"))?;
            run_single_query(controller, state, false, args.summarize, args.format).await
        }
        (None, Some(link)) => {
            let state = QueryState::parse(query_part(link))
                .with_context(|| format!("Invalid results link: {}", link))?;
            run_single_query(controller, state, true, args.summarize, args.format).await
        }
        (None, None) => anyhow::bail!(
            "Either --query, --url or --interactive must be specified.\n\
             Use --help for usage information."
        ),
    }
}
