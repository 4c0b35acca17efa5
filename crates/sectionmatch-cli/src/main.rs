use anyhow::Result;
use clap::{Parser, Subcommand};
use sectionmatch::core::{rank, Catalog, ContentRow, RankParams, RankedRow, ScoreMode};
use sectionmatch::local::{
    CatalogStore, ContainerConfig, MasterScanner, RowExtractor, FOOTER_TABLE_SELECTOR,
    MAIN_TABLE_SELECTOR,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

mod envelope;
use envelope::{add_envelope_fields, error_obj, warning_hints_from, UsageError};

const SCHEMA_VERSION: u64 = 1;
/// A pick scoring at least this is already the template it would be replaced with.
const ALREADY_MATCHES_SCORE: f64 = 99.99;

#[derive(Parser, Debug)]
#[command(name = "sectionmatch")]
#[command(
    about = "Rank a document's rows against the templates catalogued in a master document",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List catalogued template groups and their templates.
    Groups(GroupsCmd),
    /// Score every target row against the catalog and list candidates best-first.
    Rank(RankCmd),
    /// Show one (row, template) pair, with the row re-located in a fresh parse of the target.
    Pick(PickCmd),
    /// Print version info.
    Version(VersionCmd),
}

impl Commands {
    fn kind(&self) -> &'static str {
        match self {
            Commands::Groups(_) => "groups",
            Commands::Rank(_) => "rank",
            Commands::Pick(_) => "pick",
            Commands::Version(_) => "version",
        }
    }

    fn output(&self) -> &str {
        match self {
            Commands::Groups(c) => &c.output,
            Commands::Rank(c) => &c.output,
            Commands::Pick(c) => &c.output,
            Commands::Version(c) => &c.output,
        }
    }
}

#[derive(clap::Args, Debug)]
struct ContainerArgs {
    /// Selector for the main table (templates there are preceded by spacer blocks).
    #[arg(long, env = "SECTIONMATCH_MAIN_TABLE", default_value = MAIN_TABLE_SELECTOR)]
    main_table: String,
    /// Selector for the footer table (templates there are named by their START label).
    #[arg(long, env = "SECTIONMATCH_FOOTER_TABLE", default_value = FOOTER_TABLE_SELECTOR)]
    footer_table: String,
}

impl ContainerArgs {
    fn config(&self) -> ContainerConfig {
        ContainerConfig::new(&self.main_table, &self.footer_table)
    }
}

#[derive(clap::Args, Debug)]
struct GroupsCmd {
    /// Annotated master document.
    #[arg(long, env = "SECTIONMATCH_MASTER")]
    master: PathBuf,
    #[command(flatten)]
    containers: ContainerArgs,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct RankArgs {
    /// Annotated master document.
    #[arg(long, env = "SECTIONMATCH_MASTER")]
    master: PathBuf,
    /// Document whose rows are matched against the catalog.
    #[arg(long, env = "SECTIONMATCH_TARGET")]
    target: PathBuf,
    /// Scoring signal: text|structure|both
    #[arg(long, default_value = "text")]
    mode: String,
    /// Drop candidates scoring below this (0-100; anything higher drops everything).
    #[arg(long, default_value_t = 50)]
    min_cutoff: u32,
    /// Only consider templates from the group with this exact name.
    #[arg(long)]
    group: Option<String>,
    #[command(flatten)]
    containers: ContainerArgs,
}

impl RankArgs {
    fn params(&self) -> Result<RankParams> {
        Ok(RankParams {
            mode: self.mode.parse::<ScoreMode>()?,
            min_cutoff: self.min_cutoff,
            group_filter: self.group.clone(),
        })
    }

    fn request_json(&self, params: &RankParams) -> serde_json::Value {
        serde_json::json!({
            "master": self.master.display().to_string(),
            "target": self.target.display().to_string(),
            "mode": params.mode.as_str(),
            "min_cutoff": params.min_cutoff,
            "group": params.group_filter,
        })
    }
}

#[derive(clap::Args, Debug)]
struct RankCmd {
    #[command(flatten)]
    args: RankArgs,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct PickCmd {
    #[command(flatten)]
    args: RankArgs,
    /// Row index, in the order `rank` lists rows.
    #[arg(long)]
    row: usize,
    /// Candidate index within that row's ranked matches (0 is the best).
    #[arg(long = "match", default_value_t = 0)]
    match_index: usize,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn is_text(output: &str) -> bool {
    output.trim().eq_ignore_ascii_case("text")
}

fn emit(output: &str, kind: &str, started: Instant, mut payload: serde_json::Value, text: String) {
    if is_text(output) {
        println!("{text}");
    } else {
        add_envelope_fields(&mut payload, kind, started.elapsed().as_millis());
        println!("{payload}");
    }
}

/// Build the catalog through a `CatalogStore` so the JSON output can report its fingerprint.
fn load_catalog(master: &Path, config: &ContainerConfig) -> Result<(Arc<Catalog>, Option<String>)> {
    let store = CatalogStore::new();
    store.reload_if_changed(&MasterScanner::new(config.clone()), master)?;
    Ok((store.current(), store.fingerprint()))
}

fn rank_warnings(
    catalog: &Catalog,
    rows: &[ContentRow],
    ranked: &[RankedRow<'_, '_>],
    params: &RankParams,
) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if catalog.is_empty() {
        warnings.push("empty_catalog");
    }
    if rows.is_empty() {
        warnings.push("no_target_rows");
    }
    if let Some(g) = params.group_filter.as_deref().map(str::trim) {
        if !g.is_empty() && !catalog.group_names().contains(&g) {
            warnings.push("group_not_found");
        }
    }
    if !rows.is_empty() && ranked.iter().all(|r| r.matches.is_empty()) {
        warnings.push("no_matches_above_cutoff");
    }
    warnings
}

fn row_heading(index: usize, row: &ContentRow) -> String {
    format!(
        "row {index} [{}:{}] {}",
        row.container, row.position, row.section.text
    )
}

fn cmd_groups(cmd: &GroupsCmd, started: Instant) -> Result<()> {
    let (catalog, fingerprint) = load_catalog(&cmd.master, &cmd.containers.config())?;

    let groups: Vec<serde_json::Value> = catalog
        .groups()
        .iter()
        .map(|g| {
            serde_json::json!({
                "name": g.name(),
                "template_count": g.units().len(),
                "templates": g.units().iter().map(|u| serde_json::json!({
                    "name": u.name(),
                    "label": u.marker().label(),
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    let warnings: Vec<&'static str> = if catalog.is_empty() {
        vec!["empty_catalog"]
    } else {
        Vec::new()
    };
    let payload = serde_json::json!({
        "request": { "master": cmd.master.display().to_string() },
        "containers": cmd.containers.config(),
        "fingerprint": fingerprint,
        "template_count": catalog.unit_count(),
        "groups": groups,
        "warnings": warnings,
        "warning_hints": warning_hints_from(&warnings),
    });

    let mut text = String::new();
    for g in catalog.groups() {
        text.push_str(&format!("{} ({})\n", g.name(), g.units().len()));
        for u in g.units() {
            text.push_str(&format!("  {} [{}]\n", u.name(), u.marker().label()));
        }
    }
    if catalog.groups().is_empty() {
        text.push_str("no template groups\n");
    }
    emit(&cmd.output, "groups", started, payload, text.trim_end().to_string());
    Ok(())
}

fn cmd_rank(cmd: &RankCmd, started: Instant) -> Result<()> {
    let args = &cmd.args;
    let params = args.params()?;
    let config = args.containers.config();
    let (catalog, fingerprint) = load_catalog(&args.master, &config)?;
    let rows = RowExtractor::new(config).extract_file(&args.target)?;
    let ranked = rank(&rows, &catalog, &params);
    let warnings = rank_warnings(&catalog, &rows, &ranked, &params);

    let payload = serde_json::json!({
        "request": args.request_json(&params),
        "fingerprint": fingerprint,
        "row_count": ranked.len(),
        "rows": ranked.iter().map(RankedRow::to_json).collect::<Vec<_>>(),
        "warnings": warnings,
        "warning_hints": warning_hints_from(&warnings),
    });

    let mut text = String::new();
    for (i, r) in ranked.iter().enumerate() {
        text.push_str(&row_heading(i, r.row));
        text.push('\n');
        if r.matches.is_empty() {
            text.push_str("  (no candidates)\n");
        }
        for m in &r.matches {
            text.push_str(&format!(
                "  {:>5.1}  {} / {}\n",
                m.combined_score,
                m.group,
                m.unit.name()
            ));
        }
    }
    emit(&cmd.output, "rank", started, payload, text.trim_end().to_string());
    Ok(())
}

fn cmd_pick(cmd: &PickCmd, started: Instant) -> Result<()> {
    let args = &cmd.args;
    let params = args.params()?;
    let config = args.containers.config();
    let (catalog, _) = load_catalog(&args.master, &config)?;
    let extractor = RowExtractor::new(config);
    let rows = extractor.extract_file(&args.target)?;
    let ranked = rank(&rows, &catalog, &params);

    let entry = ranked.get(cmd.row).ok_or_else(|| {
        UsageError(format!(
            "--row {} out of range ({} rows)",
            cmd.row,
            ranked.len()
        ))
    })?;
    let (m, (original, unit)) = entry
        .matches
        .get(cmd.match_index)
        .zip(entry.pick(cmd.match_index))
        .ok_or_else(|| {
            UsageError(format!(
                "--match {} out of range ({} candidates for row {})",
                cmd.match_index,
                entry.matches.len(),
                cmd.row
            ))
        })?;
    let relocated = extractor.relocate(&args.target, original)?;
    tracing::info!(
        container = relocated.row.container,
        position = relocated.row.position,
        located_by = relocated.located_by,
        "picked row re-located"
    );

    let warnings: Vec<&'static str> = if m.combined_score >= ALREADY_MATCHES_SCORE {
        vec!["already_matches"]
    } else {
        Vec::new()
    };

    let marker = unit.marker();
    let payload = serde_json::json!({
        "request": args.request_json(&params),
        "row_index": cmd.row,
        "match_index": cmd.match_index,
        "row": {
            "container": relocated.row.container,
            "position": relocated.row.position,
            "text": relocated.row.section.text,
            "html": relocated.row.section.html,
            "located_by": relocated.located_by,
        },
        "replacement": {
            "group": m.group,
            "template": unit.name(),
            "label": marker.label(),
            "start_comment": marker.start_comment(),
            "end_comment": marker.end_comment(),
            "html": unit.content().html,
        },
        "scores": {
            "text": m.text_score,
            "structure": m.structure_score,
            "combined": m.combined_score,
        },
        "already_matches": !warnings.is_empty(),
        "warnings": warnings,
        "warning_hints": warning_hints_from(&warnings),
    });

    let mut text = format!(
        "{}\n  located by {}\nreplace with {} / {} ({:.1})\n{}\n{}\n{}",
        row_heading(cmd.row, &relocated.row),
        relocated.located_by,
        m.group,
        unit.name(),
        m.combined_score,
        marker.start_comment(),
        unit.content().html,
        marker.end_comment(),
    );
    if !warnings.is_empty() {
        text.push_str("\n(row already matches this template)");
    }
    emit(&cmd.output, "pick", started, payload, text);
    Ok(())
}

fn cmd_version(cmd: &VersionCmd, started: Instant) {
    let payload = serde_json::json!({
        "name": "sectionmatch",
        "version": env!("CARGO_PKG_VERSION"),
    });
    let text = format!("sectionmatch {}", env!("CARGO_PKG_VERSION"));
    emit(&cmd.output, "version", started, payload, text);
}

/// Load `KEY=VALUE` lines from `SECTIONMATCH_ENV_FILE`, never overriding the process env.
fn load_env_file() {
    let Ok(p) = std::env::var("SECTIONMATCH_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

fn init_tracing() {
    // stdout carries the JSON payload; logs go to stderr.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    load_env_file();
    init_tracing();

    let cli = Cli::parse();
    let started = Instant::now();
    let kind = cli.command.kind();
    tracing::debug!(command = kind, "dispatching");

    let res = match &cli.command {
        Commands::Groups(cmd) => cmd_groups(cmd, started),
        Commands::Rank(cmd) => cmd_rank(cmd, started),
        Commands::Pick(cmd) => cmd_pick(cmd, started),
        Commands::Version(cmd) => {
            cmd_version(cmd, started);
            Ok(())
        }
    };

    if let Err(e) = &res {
        if !is_text(cli.command.output()) {
            let mut v = serde_json::json!({ "ok": false, "error": error_obj(e) });
            add_envelope_fields(&mut v, kind, started.elapsed().as_millis());
            println!("{v}");
        }
    }
    res
}
