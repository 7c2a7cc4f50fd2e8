//! PDF assembly shared by the interior and cover exporters
//!
//! [`PdfWriter`] owns the lopdf document and appends pages in order.
//! [`PageCanvas`] collects the content stream and resources of one page and
//! takes coordinates in points with a top-left origin on the media box; it
//! flips to PDF's bottom-left origin when emitting operators.
//! [`BlockPainter`] draws the blocks of one [`PageContent`] onto a canvas.

use crate::constants::*;
use crate::convert::CoordinateConverter;
use crate::fonts::{BaseFont, FontResolver};
use crate::images::{EncodedFormat, ImageOutcome, Placeholder, ProcessedImage, deflate};
use crate::layout::{Align, Block, BlockKind, ImageBlock, PageContent, TextBlock};
use crate::text::{HeuristicEstimator, TextLayoutEngine, WidthEstimator};
use crate::types::*;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Approximate ascender height as a fraction of the font size
const ASCENT_RATIO: f32 = 0.8;

/// Approximate x-height used to center a line on a point
const MIDLINE_RATIO: f32 = 0.35;

const PLACEHOLDER_FILL: Rgb = Rgb::gray(0.94);
const PLACEHOLDER_BORDER: Rgb = Rgb::gray(0.6);
const PLACEHOLDER_TEXT: Rgb = Rgb::gray(0.2);
const PAGE_NUMBER_COLOR: Rgb = Rgb::gray(0.4);

/// Device RGB colour, components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::gray(0.0);

    pub const fn gray(level: f32) -> Self {
        Self {
            r: level,
            g: level,
            b: level,
        }
    }

    /// Parse a CSS colour, returning the colour and its alpha
    pub fn parse(css: &str) -> Option<(Rgb, f32)> {
        let color: csscolorparser::Color = css.trim().parse().ok()?;
        let [r, g, b, a] = color.to_rgba8();
        Some((
            Rgb {
                r: r as f32 / 255.0,
                g: g as f32 / 255.0,
                b: b as f32 / 255.0,
            },
            a as f32 / 255.0,
        ))
    }

    pub fn parse_or(css: &str, fallback: Rgb) -> Rgb {
        Self::parse(css).map(|(c, _)| c).unwrap_or(fallback)
    }

    fn operands(self) -> Vec<Object> {
        vec![self.r.into(), self.g.into(), self.b.into()]
    }
}

/// Encode text for a WinAnsiEncoding simple font
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

fn rect_array(left: f32, bottom: f32, right: f32, top: f32) -> Vec<Object> {
    vec![left.into(), bottom.into(), right.into(), top.into()]
}

/// Content stream and resources of one page under construction
#[derive(Debug)]
pub struct PageCanvas {
    width: f32,
    height: f32,
    trim: Rect,
    ops: Vec<Operation>,
    fonts: BTreeSet<BaseFont>,
    images: BTreeMap<String, ObjectId>,
    opacities: BTreeMap<String, f32>,
}

impl PageCanvas {
    /// A blank page of `width` × `height` points whose trim box is `trim`
    pub fn new(width: f32, height: f32, trim: Rect) -> Self {
        Self {
            width,
            height,
            trim,
            ops: Vec::new(),
            fonts: BTreeSet::new(),
            images: BTreeMap::new(),
            opacities: BTreeMap::new(),
        }
    }

    /// Interior page: trim size plus bleed on every edge
    pub fn interior(page: &PrintPageConfig) -> Self {
        Self::new(
            page.media_width(),
            page.media_height(),
            Rect::new(page.bleed_margin, page.bleed_margin, page.width, page.height),
        )
    }

    pub fn trim(&self) -> Rect {
        self.trim
    }

    /// Operators emitted so far, in content-stream order
    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    fn pdf_y(&self, y: f32) -> f32 {
        self.height - y
    }

    fn push(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn set_opacity(&mut self, opacity: f32) {
        if opacity >= 1.0 {
            return;
        }
        let key = format!("GS{}", (opacity.clamp(0.0, 1.0) * 1000.0).round() as u32);
        self.opacities.insert(key.clone(), opacity.clamp(0.0, 1.0));
        self.push("gs", vec![name(&key)]);
    }

    fn rect_operands(&self, rect: Rect) -> Vec<Object> {
        vec![
            rect.x.into(),
            self.pdf_y(rect.bottom()).into(),
            rect.width.into(),
            rect.height.into(),
        ]
    }

    /// Save the graphics state and clip everything until [`Self::end_clip`]
    /// to `rect`
    pub fn begin_clip(&mut self, rect: Rect) {
        self.push("q", vec![]);
        let operands = self.rect_operands(rect);
        self.push("re", operands);
        self.push("W", vec![]);
        self.push("n", vec![]);
    }

    pub fn end_clip(&mut self) {
        self.push("Q", vec![]);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgb, opacity: f32) {
        if opacity <= 0.0 {
            return;
        }
        self.push("q", vec![]);
        self.set_opacity(opacity);
        self.push("rg", color.operands());
        let operands = self.rect_operands(rect);
        self.push("re", operands);
        self.push("f", vec![]);
        self.push("Q", vec![]);
    }

    pub fn stroke_rect(&mut self, rect: Rect, color: Rgb, line_width: f32) {
        self.push("q", vec![]);
        self.push("RG", color.operands());
        self.push("w", vec![line_width.into()]);
        let operands = self.rect_operands(rect);
        self.push("re", operands);
        self.push("S", vec![]);
        self.push("Q", vec![]);
    }

    /// One line of text with its baseline at `baseline` (top-left coordinates)
    pub fn text(&mut self, text: &str, x: f32, baseline: f32, font: BaseFont, size: f32, color: Rgb) {
        self.fonts.insert(font);
        let y = self.pdf_y(baseline);
        self.push("BT", vec![]);
        self.push("Tf", vec![name(font.resource_name()), size.into()]);
        self.push("rg", color.operands());
        self.push("Td", vec![x.into(), y.into()]);
        self.push(
            "Tj",
            vec![Object::String(win_ansi(text), StringFormat::Literal)],
        );
        self.push("ET", vec![]);
    }

    /// One line of text rotated counter-clockwise by `angle` degrees and
    /// centered on (`cx`, `cy`). `width` is the line's estimated advance.
    #[allow(clippy::too_many_arguments)]
    pub fn centered_rotated_text(
        &mut self,
        text: &str,
        cx: f32,
        cy: f32,
        angle: f32,
        width: f32,
        font: BaseFont,
        size: f32,
        color: Rgb,
    ) {
        self.fonts.insert(font);
        let (sin, cos) = angle.to_radians().sin_cos();
        let center_y = self.pdf_y(cy);
        // Back off half the advance along the baseline and drop to the midline
        let x = cx - cos * width / 2.0 + sin * size * MIDLINE_RATIO;
        let y = center_y - sin * width / 2.0 - cos * size * MIDLINE_RATIO;

        self.push("BT", vec![]);
        self.push("Tf", vec![name(font.resource_name()), size.into()]);
        self.push("rg", color.operands());
        self.push(
            "Tm",
            vec![
                cos.into(),
                sin.into(),
                (-sin).into(),
                cos.into(),
                x.into(),
                y.into(),
            ],
        );
        self.push(
            "Tj",
            vec![Object::String(win_ansi(text), StringFormat::Literal)],
        );
        self.push("ET", vec![]);
    }

    /// Paint an image XObject into `placed`, clipped to `clip`
    pub fn image(&mut self, image: ObjectId, clip: Rect, placed: Rect) {
        let key = format!("Im{}", image.0);
        self.images.insert(key.clone(), image);

        self.begin_clip(clip);
        self.push(
            "cm",
            vec![
                placed.width.into(),
                0.into(),
                0.into(),
                placed.height.into(),
                placed.x.into(),
                self.pdf_y(placed.bottom()).into(),
            ],
        );
        self.push("Do", vec![name(&key)]);
        self.end_clip();
    }
}

/// Builds one PDF document page by page
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    fonts: HashMap<BaseFont, ObjectId>,
    images: HashMap<String, ObjectId>,
    flate_level: u32,
}

impl PdfWriter {
    pub fn new(title: &str, flate_level: u32) -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let fonts = BaseFont::ALL
            .into_iter()
            .map(|base| {
                let id = doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => base.pdf_name(),
                    "Encoding" => "WinAnsiEncoding",
                });
                (base, id)
            })
            .collect();

        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(win_ansi(title), StringFormat::Literal),
            "Producer" => Object::String(b"book-pdf".to_vec(), StringFormat::Literal),
        });
        doc.trailer.set("Info", info_id);

        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            fonts,
            images: HashMap::new(),
            flate_level,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Add an image XObject, reusing an earlier one with the same key
    pub fn embed_image(&mut self, key: &str, image: &ProcessedImage) -> ObjectId {
        if let Some(id) = self.images.get(key) {
            return *id;
        }

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width),
            "Height" => i64::from(image.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => match image.format {
                EncodedFormat::Jpeg => "DCTDecode",
                EncodedFormat::Png => "FlateDecode",
            },
        };

        if let Some(alpha) = &image.alpha {
            let mask = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(image.width),
                "Height" => i64::from(image.height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            };
            let mask_id = self.doc.add_object(Stream::new(mask, alpha.clone()));
            dict.set("SMask", mask_id);
        }

        let id = self.doc.add_object(Stream::new(dict, image.data.clone()));
        self.images.insert(key.to_string(), id);
        id
    }

    /// Append a finished page
    pub fn add_page(&mut self, canvas: PageCanvas) -> Result<ObjectId> {
        let PageCanvas {
            width,
            height,
            trim,
            ops,
            fonts,
            images,
            opacities,
        } = canvas;

        let content = Content { operations: ops }.encode()?;
        let content_id = self.doc.add_object(Stream::new(
            dictionary! { "Filter" => "FlateDecode" },
            deflate(&content, self.flate_level)?,
        ));

        let mut font_dict = Dictionary::new();
        for base in fonts {
            if let Some(id) = self.fonts.get(&base) {
                font_dict.set(base.resource_name(), *id);
            }
        }

        let mut xobjects = Dictionary::new();
        for (key, id) in images {
            xobjects.set(key, id);
        }

        let mut states = Dictionary::new();
        for (key, alpha) in opacities {
            states.set(
                key,
                dictionary! { "Type" => "ExtGState", "ca" => alpha, "CA" => alpha },
            );
        }

        let media_box = rect_array(0.0, 0.0, width, height);
        let trim_box = rect_array(trim.x, height - trim.bottom(), trim.right(), height - trim.y);

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => media_box.clone(),
            "BleedBox" => media_box,
            "TrimBox" => trim_box,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => font_dict,
                "XObject" => xobjects,
                "ExtGState" => states,
            },
        });
        self.page_ids.push(page_id);
        Ok(page_id)
    }

    /// Write the page tree and catalog and serialize the document
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.page_ids.len() as i64,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// Rectangle an image of `image_width` × `image_height` pixels covers when
/// it fills `frame`, scaled further by `zoom` and panned by (`dx`, `dy`)
pub fn cover_fit(frame: Rect, image_width: u32, image_height: u32, zoom: f32, dx: f32, dy: f32) -> Rect {
    let iw = image_width.max(1) as f32;
    let ih = image_height.max(1) as f32;
    let scale = (frame.width / iw).max(frame.height / ih) * zoom;
    let width = iw * scale;
    let height = ih * scale;
    Rect::new(
        frame.center_x() - width / 2.0 + dx,
        frame.center_y() - height / 2.0 + dy,
        width,
        height,
    )
}

/// Draws the blocks of a page into a region of a canvas
pub struct BlockPainter<'a, E: WidthEstimator = HeuristicEstimator> {
    pub converter: &'a CoordinateConverter,
    pub fonts: &'a FontResolver,
    pub text: &'a TextLayoutEngine<E>,
    /// Normalized images keyed by reference
    pub images: &'a HashMap<String, ImageOutcome>,
}

impl<E: WidthEstimator> BlockPainter<'_, E> {
    /// Draw `content` with its screen canvas mapped onto the trim-sized
    /// region whose top-left corner is `origin`.
    pub fn draw_content(
        &self,
        writer: &mut PdfWriter,
        canvas: &mut PageCanvas,
        content: &PageContent,
        origin: Point,
        page: usize,
        warnings: &mut Vec<ExportWarning>,
    ) {
        for block in content.sorted_blocks() {
            if !block.is_renderable() {
                log::debug!("Skipping zero-size block {} on page {}", block.id, page);
                warnings.push(ExportWarning::EmptyBlock {
                    page,
                    block_id: block.id.clone(),
                });
                continue;
            }
            let rect = self.converter.block_rect(&block);
            let placed = rect.translate(origin.x, origin.y);
            match &block.kind {
                BlockKind::Text(text) => {
                    if !self.converter.is_within_safe_area(rect.origin(), rect.size()) {
                        log::warn!("Text block {} on page {} extends past the safe area", block.id, page);
                        warnings.push(ExportWarning::OutsideSafeArea {
                            page,
                            block_id: block.id.clone(),
                        });
                    }
                    self.draw_text_block(canvas, placed, &block, text, page, warnings);
                }
                BlockKind::Image(image) => {
                    self.draw_image_block(writer, canvas, placed, &block, image, page, warnings)
                }
            }
        }
    }

    fn draw_text_block(
        &self,
        canvas: &mut PageCanvas,
        rect: Rect,
        block: &Block,
        text: &TextBlock,
        page: usize,
        warnings: &mut Vec<ExportWarning>,
    ) {
        if let Some((color, alpha)) = text.background_color.as_deref().and_then(Rgb::parse) {
            canvas.fill_rect(rect, color, alpha * text.background_opacity());
        }

        if text.text.trim().is_empty() {
            return;
        }

        let requested = text.font_family.as_deref().unwrap_or(DEFAULT_FONT_FAMILY);
        let font = self.fonts.resolve_detailed(requested);
        if font.substituted {
            log::warn!(
                "Font {:?} is not available, using {} for block {}",
                requested,
                font.family,
                block.id
            );
            warnings.push(ExportWarning::FontSubstituted {
                page,
                block_id: block.id.clone(),
                requested: requested.to_string(),
                used: font.family.to_string(),
            });
        }

        let size = self.converter.convert_font_size(text.font_size());
        let color = Rgb::parse_or(text.color(), Rgb::parse_or(DEFAULT_TEXT_COLOR, Rgb::BLACK));
        let layout = self
            .text
            .layout_paragraphs(&text.text, text.list_type, size, rect.width, font.family);

        let first_baseline =
            rect.y + (layout.line_height - size) / 2.0 + size * ASCENT_RATIO;
        for (i, line) in layout.lines.iter().enumerate() {
            let width = self.text.estimated_width(line, size, font.family);
            let x = match text.align {
                Align::Left => rect.x,
                Align::Center => rect.center_x() - width / 2.0,
                Align::Right => rect.right() - width,
            };
            let baseline = first_baseline + i as f32 * layout.line_height;
            canvas.text(line, x, baseline, font.base, size, color);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_image_block(
        &self,
        writer: &mut PdfWriter,
        canvas: &mut PageCanvas,
        rect: Rect,
        block: &Block,
        image: &ImageBlock,
        page: usize,
        warnings: &mut Vec<ExportWarning>,
    ) {
        let Some(reference) = image.reference() else {
            self.draw_placeholder(canvas, rect, &Placeholder::empty());
            return;
        };

        let outcome = self.images.get(reference).cloned().unwrap_or_else(|| {
            Err(Placeholder::for_reference(reference, "image was not prepared"))
        });

        match outcome {
            Ok(processed) => {
                let id = writer.embed_image(reference, &processed);
                let (dx, dy) = self.converter.convert_offset(image.offset_x, image.offset_y);
                let placed = cover_fit(
                    rect,
                    processed.width,
                    processed.height,
                    image.zoom(),
                    dx,
                    dy,
                );
                canvas.image(id, rect, placed);
            }
            Err(placeholder) => {
                log::warn!(
                    "Image block {} on page {} drawn as placeholder: {}",
                    block.id,
                    page,
                    placeholder.reason
                );
                warnings.push(ExportWarning::ImagePlaceholder {
                    page,
                    block_id: block.id.clone(),
                    reason: placeholder.reason.clone(),
                });
                self.draw_placeholder(canvas, rect, &placeholder);
            }
        }
    }

    /// Grey box with up to three caption lines in the top-left corner
    pub fn draw_placeholder(&self, canvas: &mut PageCanvas, rect: Rect, placeholder: &Placeholder) {
        canvas.fill_rect(rect, PLACEHOLDER_FILL, 1.0);
        canvas.stroke_rect(rect, PLACEHOLDER_BORDER, 0.5);

        let family = BaseFont::Helvetica.pdf_name();
        let layout = self.text.layout_text(
            &placeholder.caption,
            PLACEHOLDER_CAPTION_SIZE,
            (rect.width - 4.0).max(1.0),
            family,
        );
        for (i, line) in layout.lines.iter().take(PLACEHOLDER_MAX_LINES).enumerate() {
            canvas.text(
                line,
                rect.x + 2.0,
                rect.y + 12.0 + i as f32 * 10.0,
                BaseFont::Helvetica,
                PLACEHOLDER_CAPTION_SIZE,
                PLACEHOLDER_TEXT,
            );
        }
    }
}

/// Page number near the bottom-right corner of the trim box
pub fn draw_page_number(canvas: &mut PageCanvas, number: usize) {
    let trim = canvas.trim();
    canvas.text(
        &number.to_string(),
        trim.right() - PAGE_NUMBER_OFFSET_X,
        trim.bottom() - PAGE_NUMBER_OFFSET_Y,
        BaseFont::Helvetica,
        PAGE_NUMBER_FONT_SIZE,
        PAGE_NUMBER_COLOR,
    );
}

/// Diagonal watermark across the middle of the trim box
pub fn draw_watermark<E: WidthEstimator>(canvas: &mut PageCanvas, text: &str, engine: &TextLayoutEngine<E>) {
    if text.trim().is_empty() {
        return;
    }
    let trim = canvas.trim();
    let width = engine.estimated_width(text, WATERMARK_FONT_SIZE, BaseFont::Helvetica.pdf_name());
    canvas.centered_rotated_text(
        text,
        trim.center_x(),
        trim.center_y(),
        45.0,
        width,
        BaseFont::Helvetica,
        WATERMARK_FONT_SIZE,
        Rgb::gray(WATERMARK_GRAY),
    );
}
