//! Interior pages export
//!
//! One PDF page per flattened print page. Each page's media box is the
//! trim size plus bleed, and block content is laid out against the trim
//! box.

use crate::convert::CoordinateConverter;
use crate::cover::extract_title;
use crate::flatten::flatten;
use crate::fonts::FontResolver;
use crate::images::{ImageNormalizer, ImageOutcome};
use crate::layout::BookLayout;
use crate::options::ExportOptions;
use crate::render::{BlockPainter, PageCanvas, PdfWriter, draw_page_number, draw_watermark};
use crate::text::TextLayoutEngine;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct InternalPagesExporter {
    page: PrintPageConfig,
    fonts: Arc<FontResolver>,
    images: ImageNormalizer,
}

impl Default for InternalPagesExporter {
    fn default() -> Self {
        Self::new(Arc::new(FontResolver::new()), ImageNormalizer::default())
    }
}

impl InternalPagesExporter {
    pub fn new(fonts: Arc<FontResolver>, images: ImageNormalizer) -> Self {
        Self {
            page: PrintPageConfig::default(),
            fonts,
            images,
        }
    }

    pub fn page_config(&self) -> &PrintPageConfig {
        &self.page
    }

    /// Render the interior of `layout`.
    ///
    /// Fails only on missing or invalid input and PDF backend errors;
    /// broken images and unknown fonts are recorded as warnings.
    pub async fn export(
        &self,
        layout: Option<&BookLayout>,
        options: &ExportOptions,
    ) -> Result<InternalPagesPdf> {
        let layout = layout.ok_or(ExportError::MissingLayout)?;
        options.validate()?;
        layout.validate()?;

        self.fonts.register_fonts();

        let references: Vec<String> = flatten(layout)
            .iter()
            .flat_map(|page| page.content.image_references())
            .collect();
        let images = self
            .images
            .normalize_all(references, options.quality, &options.limits)
            .await;

        let layout = layout.clone();
        let options = options.clone();
        let fonts = self.fonts.clone();
        let page = self.page;

        let pdf = tokio::task::spawn_blocking(move || {
            render_interior(&layout, &options, &page, &fonts, &images)
        })
        .await??;

        log::info!(
            "Exported {} interior pages ({} bytes, {} warnings)",
            pdf.page_count,
            pdf.bytes.len(),
            pdf.warnings.len()
        );
        Ok(pdf)
    }
}

fn render_interior(
    layout: &BookLayout,
    options: &ExportOptions,
    page: &PrintPageConfig,
    fonts: &FontResolver,
    images: &HashMap<String, ImageOutcome>,
) -> Result<InternalPagesPdf> {
    let converter = CoordinateConverter::new(*page);
    let text = TextLayoutEngine::default();
    let painter = BlockPainter {
        converter: &converter,
        fonts,
        text: &text,
        images,
    };

    let title = extract_title(&layout.cover.content);
    let mut writer = PdfWriter::new(&title, options.quality.settings().flate_level());
    let mut warnings = Vec::new();
    let origin = Point::new(page.bleed_margin, page.bleed_margin);

    let pages = flatten(layout);
    for print_page in &pages {
        let number = print_page.absolute_page_number;
        log::debug!("Rendering {} page {}", print_page.kind, number);

        let mut canvas = PageCanvas::interior(page);
        painter.draw_content(
            &mut writer,
            &mut canvas,
            print_page.content,
            origin,
            number,
            &mut warnings,
        );

        if options.include_page_numbers {
            draw_page_number(&mut canvas, number);
        }
        if let Some(watermark) = options.watermark.as_deref() {
            draw_watermark(&mut canvas, watermark, &text);
        }

        writer.add_page(canvas)?;
    }

    let page_count = writer.page_count();
    Ok(InternalPagesPdf {
        bytes: writer.finish()?,
        page_count,
        warnings,
    })
}
