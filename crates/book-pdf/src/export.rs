use crate::cover::CoverExporter;
use crate::fonts::FontResolver;
use crate::images::{AssetDirectory, ImageNormalizer, ImageSource};
use crate::interior::InternalPagesExporter;
use crate::layout::BookLayout;
use crate::options::ExportOptions;
use crate::types::*;
use std::sync::Arc;

/// Title (1) + two pages per spread + ending (1)
pub fn calculate_interior_page_count(layout: &BookLayout) -> i64 {
    layout.interior_page_count() as i64
}

/// Runs the interior and cover exporters over one layout.
///
/// Both exporters share a font registry and an image cache, so an image on
/// the cover that also appears inside is only processed once per tier.
#[derive(Debug, Clone)]
pub struct BookExporter {
    interior: InternalPagesExporter,
    cover: CoverExporter,
}

impl Default for BookExporter {
    fn default() -> Self {
        Self::new(AssetDirectory::none())
    }
}

impl BookExporter {
    pub fn new(source: impl ImageSource + 'static) -> Self {
        let fonts = Arc::new(FontResolver::new());
        let images = ImageNormalizer::new(source);
        Self {
            interior: InternalPagesExporter::new(fonts.clone(), images.clone()),
            cover: CoverExporter::new(fonts, images),
        }
    }

    pub fn interior(&self) -> &InternalPagesExporter {
        &self.interior
    }

    pub fn cover(&self) -> &CoverExporter {
        &self.cover
    }

    /// Export both PDFs. Succeeds only if both do; the first failure is
    /// returned.
    pub async fn export(
        &self,
        layout: Option<&BookLayout>,
        options: &ExportOptions,
    ) -> Result<CombinedExport> {
        let layout = layout.ok_or(ExportError::MissingLayout)?;
        let interior_page_count = calculate_interior_page_count(layout);

        let internal_pages = self.interior.export(Some(layout), options).await?;
        let cover = self
            .cover
            .export(Some(layout), interior_page_count, options)
            .await?;

        Ok(CombinedExport {
            internal_pages,
            cover,
        })
    }
}

/// Export interior and cover with default services
pub async fn export_both(
    layout: Option<&BookLayout>,
    options: &ExportOptions,
) -> Result<CombinedExport> {
    BookExporter::default().export(layout, options).await
}
