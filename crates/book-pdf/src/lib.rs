pub mod constants;
mod convert;
mod cover;
mod export;
mod flatten;
mod fonts;
mod images;
mod interior;
mod layout;
mod options;
pub mod render;
mod spine;
mod text;
mod types;

pub use convert::CoordinateConverter;
pub use cover::{CoverExporter, CoverGeometry, CoverSectionKind, extract_author, extract_title};
pub use export::{BookExporter, calculate_interior_page_count, export_both};
pub use flatten::{PrintPage, PrintPageKind, flatten};
pub use fonts::{BaseFont, FontResolver, ResolvedFont};
pub use images::{
    AssetDirectory, EncodedFormat, ImageNormalizer, ImageOutcome, ImageRef, ImageSource,
    Placeholder, ProcessedImage, validate_image_url,
};
pub use interior::InternalPagesExporter;
pub use layout::*;
pub use options::*;
pub use spine::SpineCalculator;
pub use text::*;
pub use types::*;
