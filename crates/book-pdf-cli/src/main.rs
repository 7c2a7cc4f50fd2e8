use anyhow::{Context, Result};
use book_pdf::{
    AssetDirectory, BookExporter, BookLayout, ExportOptions, ExportReport, Quality,
    SpineCalculator, calculate_interior_page_count, constants, flatten,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bookpdf", about = "Print-ready PDF export for picture books", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export interior pages and cover PDFs from a layout JSON file
    Export {
        /// Book layout JSON
        layout: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Base name for output files (defaults to the layout file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Export options JSON; command-line flags override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory that site-relative image paths resolve against
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Image quality tier
        #[arg(long, value_enum)]
        quality: Option<QualityArg>,

        /// Print page numbers on interior pages
        #[arg(long)]
        page_numbers: bool,

        /// Watermark text drawn across every interior page
        #[arg(long)]
        watermark: Option<String>,

        /// Leave the spine blank
        #[arg(long)]
        no_spine_text: bool,

        /// Spine text colour (any CSS colour)
        #[arg(long)]
        spine_color: Option<String>,

        /// Spine font size in points
        #[arg(long)]
        spine_font_size: Option<f32>,

        /// Write a JSON export report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show spine width for an interior page count
    Spine {
        /// Interior page count
        #[arg(allow_negative_numbers = true)]
        pages: i64,
    },

    /// List the interior pages of a layout in print order
    Pages {
        /// Book layout JSON
        layout: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum QualityArg {
    Low,
    Medium,
    High,
}

impl From<QualityArg> for Quality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Low => Self::Low,
            QualityArg::Medium => Self::Medium,
            QualityArg::High => Self::High,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            layout,
            out,
            name,
            config,
            assets,
            quality,
            page_numbers,
            watermark,
            no_spine_text,
            spine_color,
            spine_font_size,
            report,
        } => {
            let mut options = match &config {
                Some(path) => ExportOptions::load(path)
                    .await
                    .with_context(|| format!("loading options from {}", path.display()))?,
                None => ExportOptions::default(),
            };
            if let Some(quality) = quality {
                options.quality = quality.into();
            }
            options.include_page_numbers |= page_numbers;
            if watermark.is_some() {
                options.watermark = watermark;
            }
            if no_spine_text {
                options.include_spine_text = false;
            }
            if let Some(color) = spine_color {
                options.spine_text_color = color;
            }
            if let Some(size) = spine_font_size {
                options.spine_font_size = size;
            }

            let book = BookLayout::load(&layout)
                .await
                .with_context(|| format!("loading layout from {}", layout.display()))?;

            let exporter = match assets {
                Some(dir) => BookExporter::new(AssetDirectory::new(dir)),
                None => BookExporter::new(AssetDirectory::none()),
            };

            log::info!(
                "Exporting {} at {} quality",
                layout.display(),
                options.quality
            );
            let result = exporter.export(Some(&book), &options).await;

            if let Some(path) = &report {
                let json = serde_json::to_string_pretty(&ExportReport::from_result(&result))?;
                tokio::fs::write(path, json).await?;
                println!("Report → {}", path.display());
            }

            let export = result?;
            let name = name.unwrap_or_else(|| {
                layout
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "book".to_string())
            });
            tokio::fs::create_dir_all(&out).await?;
            let interior_path = out.join(format!("{}-internal-pages.pdf", name));
            let cover_path = out.join(format!("{}-cover.pdf", name));
            tokio::fs::write(&interior_path, &export.internal_pages.bytes).await?;
            tokio::fs::write(&cover_path, &export.cover.bytes).await?;

            println!("Export Summary:");
            println!("  Interior pages: {}", export.internal_page_count());
            println!(
                "  Spine width: {:.2}pt ({:.2}mm)",
                export.cover_spine_width(),
                constants::pt_to_mm(export.cover_spine_width())
            );
            println!("  Cover width: {:.2}pt", export.cover_total_width());
            let warnings: Vec<_> = export.warnings().collect();
            if !warnings.is_empty() {
                println!("  Warnings: {}", warnings.len());
                for warning in warnings {
                    println!("    {}", serde_json::to_string(warning)?);
                }
            }
            println!("Interior → {}", interior_path.display());
            println!("Cover → {}", cover_path.display());
        }

        Commands::Spine { pages } => {
            let calculator = SpineCalculator::default();
            let width_mm = calculator.spine_width_mm(pages)?;
            let width_pt = calculator.spine_width_points(pages)?;
            println!("Spine for {} pages:", pages);
            println!("  Width: {:.2}mm ({:.2}pt)", width_mm, width_pt);
            println!(
                "  Cover width: {:.2}pt",
                calculator.total_cover_width_points(pages)?
            );
            if !calculator.validate_page_count(pages) {
                println!(
                    "  Warning: {} pages is more than {}; spine clamped to {}-{}mm",
                    pages,
                    constants::MAX_REASONABLE_PAGE_COUNT,
                    constants::MIN_SPINE_MM,
                    constants::MAX_SPINE_MM
                );
            }
        }

        Commands::Pages { layout } => {
            let book = BookLayout::load(&layout).await?;
            println!(
                "{} interior pages ({} spreads):",
                calculate_interior_page_count(&book),
                book.spreads.len()
            );
            for page in flatten(&book) {
                let blocks = page.content.effective_blocks();
                let first_line = page.content.first_text_line().unwrap_or_default();
                println!(
                    "  {:>3}  {:<6}  {} blocks  {}",
                    page.absolute_page_number,
                    page.kind.to_string(),
                    blocks.len(),
                    first_line
                );
            }
        }
    }

    Ok(())
}
