use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rfexport::extract::CompiledRules;
use rfexport::rendering::PrerenderedRasterizer;
use rfexport::{CaptureStrategy, ExportConfig, Exporter, PageGeometry, Pagination, SourceRaster};
use scraper::Html;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rfexport", version, about = "Export saved article pages to PDF or print-ready HTML")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export a saved article page
    Export(ExportArgs),
    /// Show how a capture of the given size would be paginated
    Plan(PlanArgs),
    /// Print the article metadata found in a saved page
    Meta {
        /// Saved HTML page
        html: PathBuf,
        /// JSON configuration file (for custom extraction rules)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Raster,
    Print,
}

#[derive(Args)]
struct ExportArgs {
    /// Saved HTML page
    html: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
    /// Capture strategy (overrides the config file)
    #[arg(short, long, value_enum)]
    strategy: Option<Strategy>,
    /// Prerendered capture of the export document (PNG or JPEG)
    #[arg(long)]
    screenshot: Option<PathBuf>,
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Base URL for resolving relative image links
    #[arg(long)]
    base_url: Option<String>,
    /// Do not fetch and embed article images
    #[arg(long)]
    no_images: bool,
    /// Open the print dialog when the print document loads
    #[arg(long)]
    auto_print: bool,
}

#[derive(Args)]
struct PlanArgs {
    #[arg(long)]
    source_width: u32,
    #[arg(long)]
    source_height: u32,
    #[arg(long, default_value_t = PageGeometry::default().page_width)]
    page_width: u32,
    #[arg(long, default_value_t = PageGeometry::default().page_height)]
    page_height: u32,
    #[arg(long, default_value_t = PageGeometry::default().top_margin)]
    top_margin: u32,
    #[arg(long, default_value_t = PageGeometry::default().bottom_margin)]
    bottom_margin: u32,
}

fn load_config(path: Option<&PathBuf>) -> Result<ExportConfig> {
    match path {
        Some(p) => Ok(ExportConfig::from_file(p)?),
        None => Ok(ExportConfig::default()),
    }
}

fn run_export(args: ExportArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(s) = args.strategy {
        config.strategy = match s {
            Strategy::Raster => CaptureStrategy::Raster,
            Strategy::Print => CaptureStrategy::Print,
        };
    }
    if args.base_url.is_some() {
        config.base_url = args.base_url;
    }
    if args.no_images {
        config.inline_images = false;
    }
    if args.auto_print {
        config.auto_print = true;
    }

    let html = std::fs::read_to_string(&args.html)
        .with_context(|| format!("reading {}", args.html.display()))?;
    let mut exporter = Exporter::new(config)?;
    if let Some(shot) = &args.screenshot {
        exporter = exporter.with_rasterizer(PrerenderedRasterizer::from_file(shot)?);
    } else if exporter.config().strategy == CaptureStrategy::Raster && !cfg!(feature = "cdp") {
        bail!("raster export needs --screenshot (or a build with the `cdp` feature)");
    }

    let output = exporter.export(&html)?;
    let path = output.save_in(&args.output)?;
    match output.page_count {
        Some(n) => println!("{} ({} pages)", path.display(), n),
        None => println!("{}", path.display()),
    }
    Ok(())
}

fn run_plan(args: PlanArgs) -> Result<()> {
    let geometry = PageGeometry {
        page_width: args.page_width,
        page_height: args.page_height,
        top_margin: args.top_margin,
        bottom_margin: args.bottom_margin,
    };
    let source = SourceRaster { width: args.source_width, height: args.source_height };
    let plan = Pagination::new(source, geometry)?;
    let pages: Vec<_> = plan
        .slices()
        .map(|s| {
            let p = plan.placement(&s);
            serde_json::json!({
                "index": s.index,
                "source_y": s.source_y,
                "height": s.height,
                "placement": { "x": p.x, "y": p.y, "width": p.width, "height": p.height },
            })
        })
        .collect();
    let report = serde_json::json!({
        "scale_factor": plan.scale_factor(),
        "content_height": plan.content_height(),
        "slice_height": plan.slice_height(),
        "total_pages": plan.total_pages(),
        "pages": pages,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_meta(html: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_ref())?;
    let rules = CompiledRules::compile(&config.rules)?;
    let text = std::fs::read_to_string(&html).with_context(|| format!("reading {}", html.display()))?;
    let document = Html::parse_document(&text);
    if !rules.is_ready(&document) {
        log::warn!("{} does not look like a fully rendered article", html.display());
    }
    println!("{}", serde_json::to_string_pretty(&rules.meta(&document))?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Export(args) => run_export(args),
        Command::Plan(args) => run_plan(args),
        Command::Meta { html, config } => run_meta(html, config),
    }
}
