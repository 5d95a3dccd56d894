use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use geotrack_rs::config::{AuditConfig, SearchConfig};
use geotrack_rs::llm::openai::LlmClient;
use geotrack_rs::questions::split_questions;
use geotrack_rs::scoring::summarize;
use geotrack_rs::serper::{Searcher, Serper};
use geotrack_rs::server::{run_server, Engine};
use geotrack_rs::types::BackendDescriptor;

#[derive(Parser)]
#[command(name="geotrack", version)]
struct Cli {
  #[command(subcommand)]
  cmd: Cmd,
  #[command(flatten)]
  conn: ConnArgs,
}

#[derive(Args)]
struct ConnArgs {
  /// TOML run configuration; flags override it
  #[arg(long, global=true)] config: Option<String>,
  #[arg(long, env="OPENAI_API_KEY", hide_env_values=true, global=true)] api_key: Option<String>,
  #[arg(long, env="OPENAI_BASE_URL", global=true)] base_url: Option<String>,
  #[arg(long, env="SERPER_API_KEY", hide_env_values=true, global=true)] serper_key: Option<String>,
}

#[derive(Subcommand)]
enum Cmd {
  /// Audit a list of questions and write result rows as JSONL
  Run {
    /// One question per line; `-` reads stdin
    #[arg(long)] questions_file: String,
    /// Write rows here instead of stdout
    #[arg(long)] output: Option<String>,
    #[command(flatten)] run: RunArgs,
  },
  /// Serve `POST /audit`
  Serve {
    #[arg(long, default_value="127.0.0.1:8080")] addr: String,
    #[command(flatten)] run: RunArgs,
  },
}

#[derive(Args)]
struct RunArgs {
  /// Brand or domain to look for, e.g. nike.com
  #[arg(long)] target: Option<String>,
  /// Backend in preference order, `model` or `model+search`; repeatable
  #[arg(long="backend")] backends: Vec<BackendDescriptor>,
  #[arg(long)] classifier: Option<String>,
  /// Retry a failed search attempt once without search on the same backend
  #[arg(long)] downgrade_augmented: bool,
  #[arg(long)] concurrency: Option<usize>,
  /// Enable the web search grounding stage for this region (e.g. fr)
  #[arg(long)] search_region: Option<String>,
  /// URL substring excluded from search results; repeatable
  #[arg(long="deny-url")] deny_url: Vec<String>,
}

impl RunArgs {
  fn apply(self, cfg: &mut AuditConfig) {
    if let Some(t) = self.target { cfg.target = t; }
    if !self.backends.is_empty() { cfg.backends = self.backends; }
    if let Some(c) = self.classifier { cfg.classifier = c; }
    if self.downgrade_augmented { cfg.downgrade_augmented = true; }
    if let Some(n) = self.concurrency { cfg.concurrency = n; }
    // either search flag turns the grounding stage on
    if let Some(region) = self.search_region {
      cfg.search.get_or_insert_with(SearchConfig::default).region = region;
    }
    if !self.deny_url.is_empty() {
      cfg.search.get_or_insert_with(SearchConfig::default).deny_url_substrings = self.deny_url;
    }
  }
}

fn load_config(cli: &ConnArgs, run: RunArgs) -> Result<AuditConfig> {
  let mut cfg = match &cli.config {
    Some(path) => AuditConfig::load(path)?,
    None => AuditConfig::default(),
  };
  run.apply(&mut cfg);
  cfg.target = cfg.target.trim().to_string();
  Ok(cfg)
}

fn build_engine(cli: &ConnArgs, cfg: &AuditConfig) -> Result<Engine> {
  let llm = Arc::new(LlmClient::new(cli.base_url.clone(), cli.api_key.clone()));
  let searcher: Option<Arc<dyn Searcher>> = match (&cfg.search, &cli.serper_key) {
    (Some(s), Some(key)) => Some(Arc::new(Serper::new(key.clone(), s.qps, Duration::from_secs(s.timeout_secs))?)),
    _ => None,
  };
  let auditor = cfg.auditor(llm.clone(), llm, searcher)?;
  let default_target = Some(cfg.target.clone()).filter(|t| !t.is_empty());
  Ok(Engine { auditor, default_target })
}

fn read_input(path: &str) -> Result<String> {
  if path == "-" {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    return Ok(buf);
  }
  std::fs::read_to_string(path).with_context(|| format!("reading {path}"))
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  match cli.cmd {
    Cmd::Run { questions_file, output, run } => {
      let cfg = load_config(&cli.conn, run)?;
      cfg.validate_for_run()?;
      let engine = build_engine(&cli.conn, &cfg)?;
      let questions = split_questions(&read_input(&questions_file)?);
      info!(questions = questions.len(), target = %cfg.target, "starting audit");

      let rows = engine.auditor.run(&questions, &cfg.target).await;
      let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(std::fs::File::create(&path).with_context(|| format!("creating {path}"))?),
        None => Box::new(std::io::stdout().lock()),
      };
      for row in &rows {
        serde_json::to_writer(&mut out, row)?;
        writeln!(out)?;
      }
      out.flush()?;
      for row in &rows {
        let mark = if row.verdict.mentioned { "yes" } else { "no" };
        eprintln!("{mark:>3}  {}  [{}]  {}", row.question, row.provenance.label(), row.sources_preview(3));
      }
      eprintln!("{}", summarize(&rows));
    }
    Cmd::Serve { addr, run } => {
      let cfg = load_config(&cli.conn, run)?;
      cfg.validate()?;
      let engine = build_engine(&cli.conn, &cfg)?;
      run_server(engine, &addr).await?;
    }
  }
  Ok(())
}
