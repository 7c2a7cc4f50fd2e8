//! Book layout document
//!
//! The editor's wire format: a cover, a title page, an ordered run of
//! spreads and an ending page. Every page carries absolutely positioned
//! blocks in screen pixels on the 720×540 editing canvas. The export
//! pipeline only ever reads these types.

use crate::constants::{
    DEFAULT_IMAGE_ZOOM, DEFAULT_SCREEN_FONT_SIZE, DEFAULT_TEXT_COLOR, MAX_IMAGE_ZOOM,
    MIN_IMAGE_ZOOM, SCREEN_HEIGHT_PX, SCREEN_WIDTH_PX,
};
use crate::types::{ExportError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    #[default]
    None,
    Bullet,
    Numbered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixedPageKind {
    Cover,
    Title,
    Ending,
}

/// Text properties of a block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    #[serde(default)]
    pub text: String,
    /// Screen pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub align: Align,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// CSS font stack, e.g. `"Inter, ui-sans-serif, system-ui, Arial"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default)]
    pub list_type: ListType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_opacity: Option<f32>,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn font_size(&self) -> f32 {
        self.font_size.unwrap_or(DEFAULT_SCREEN_FONT_SIZE)
    }

    pub fn color(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_TEXT_COLOR)
    }

    /// Background opacity clamped to [0, 1]; a missing value is opaque
    pub fn background_opacity(&self) -> f32 {
        self.background_opacity.unwrap_or(1.0).clamp(0.0, 1.0)
    }
}

/// Image properties of a block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlock {
    /// Data URL, absolute URL or site-relative path; `None` is an empty frame
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f32>,
    /// Horizontal pan in screen pixels (positive = right)
    #[serde(default)]
    pub offset_x: f32,
    /// Vertical pan in screen pixels (positive = down)
    #[serde(default)]
    pub offset_y: f32,
}

impl ImageBlock {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            ..Default::default()
        }
    }

    /// Zoom clamped to [0.1, 3]
    pub fn zoom(&self) -> f32 {
        let zoom = self.zoom.unwrap_or(DEFAULT_IMAGE_ZOOM);
        if zoom.is_finite() {
            zoom.clamp(MIN_IMAGE_ZOOM, MAX_IMAGE_ZOOM)
        } else {
            DEFAULT_IMAGE_ZOOM
        }
    }

    /// The image reference, treating blank strings as empty
    pub fn reference(&self) -> Option<&str> {
        self.image.as_deref().filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockKind {
    Text(TextBlock),
    Image(ImageBlock),
}

/// An absolutely positioned element, in screen pixels with a top-left origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(flatten)]
    pub kind: BlockKind,
}

impl Block {
    pub fn text(id: impl Into<String>, x: f32, y: f32, w: f32, h: f32, text: TextBlock) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            w,
            h,
            z: 0.0,
            kind: BlockKind::Text(text),
        }
    }

    pub fn image(id: impl Into<String>, x: f32, y: f32, w: f32, h: f32, image: ImageBlock) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            w,
            h,
            z: 0.0,
            kind: BlockKind::Image(image),
        }
    }

    pub fn with_z(mut self, z: f32) -> Self {
        self.z = z;
        self
    }

    /// Blocks need a positive width and height to be drawn
    pub fn is_renderable(&self) -> bool {
        self.w > 0.0 && self.h > 0.0
    }

    pub fn as_text(&self) -> Option<&TextBlock> {
        match &self.kind {
            BlockKind::Text(text) => Some(text),
            BlockKind::Image(_) => None,
        }
    }
}

fn default_legacy_font_size() -> f32 {
    DEFAULT_SCREEN_FONT_SIZE
}

fn default_legacy_text_color() -> String {
    DEFAULT_TEXT_COLOR.to_string()
}

/// Content of one printable page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    // Legacy scalar fields, superseded by `blocks` when present
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_legacy_font_size")]
    pub font_size: f32,
    #[serde(default)]
    pub align: Align,
    #[serde(default = "default_legacy_text_color")]
    pub text_color: String,
    #[serde(default)]
    pub padding: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Block>>,
}

impl Default for PageContent {
    fn default() -> Self {
        Self {
            text: String::new(),
            image: None,
            font_size: DEFAULT_SCREEN_FONT_SIZE,
            align: Align::Left,
            text_color: DEFAULT_TEXT_COLOR.to_string(),
            padding: 0.0,
            blocks: None,
        }
    }
}

impl PageContent {
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Some(blocks),
            ..Default::default()
        }
    }

    /// Blocks to render for this page.
    ///
    /// Pages saved before the block model carry only the legacy fields;
    /// those are turned into a full-canvas image under a padded text block.
    pub fn effective_blocks(&self) -> Cow<'_, [Block]> {
        if let Some(blocks) = &self.blocks {
            return Cow::Borrowed(blocks.as_slice());
        }

        let mut blocks = Vec::new();
        if let Some(image) = self.image.as_deref().filter(|s| !s.trim().is_empty()) {
            blocks.push(Block::image(
                "legacy-image",
                0.0,
                0.0,
                SCREEN_WIDTH_PX,
                SCREEN_HEIGHT_PX,
                ImageBlock::new(image),
            ));
        }
        if !self.text.trim().is_empty() {
            let padding = self.padding.max(0.0);
            let text = TextBlock {
                text: self.text.clone(),
                font_size: Some(self.font_size),
                align: self.align,
                color: Some(self.text_color.clone()),
                ..Default::default()
            };
            blocks.push(
                Block::text(
                    "legacy-text",
                    padding,
                    padding,
                    SCREEN_WIDTH_PX - 2.0 * padding,
                    SCREEN_HEIGHT_PX - 2.0 * padding,
                    text,
                )
                .with_z(1.0),
            );
        }
        Cow::Owned(blocks)
    }

    /// Blocks ordered back-to-front by `z`, ties kept in document order
    pub fn sorted_blocks(&self) -> Vec<Block> {
        let mut blocks = self.effective_blocks().into_owned();
        blocks.sort_by(|a, b| a.z.total_cmp(&b.z));
        blocks
    }

    /// Distinct image references used by this page, in block order
    pub fn image_references(&self) -> Vec<String> {
        let mut references: Vec<String> = Vec::new();
        for block in self.effective_blocks().iter() {
            if let BlockKind::Image(image) = &block.kind {
                if let Some(reference) = image.reference() {
                    if !references.iter().any(|r| r == reference) {
                        references.push(reference.to_string());
                    }
                }
            }
        }
        references
    }

    /// First line of the first non-empty text block, or of the legacy text
    pub fn first_text_line(&self) -> Option<String> {
        let from_blocks = self.blocks.as_ref().and_then(|blocks| {
            blocks
                .iter()
                .filter_map(Block::as_text)
                .find(|t| !t.text.is_empty())
                .and_then(|t| t.text.lines().next())
                .map(str::to_string)
        });
        from_blocks.or_else(|| {
            self.text
                .lines()
                .next()
                .filter(|line| !line.is_empty())
                .map(str::to_string)
        })
    }

    fn check_unique_ids(&self, page: &str) -> Result<()> {
        let mut seen = HashSet::new();
        for block in self.blocks.iter().flatten() {
            if !seen.insert(block.id.as_str()) {
                return Err(ExportError::Config(format!(
                    "Duplicate block id {:?} on {} page",
                    block.id, page
                )));
            }
        }
        Ok(())
    }
}

/// A structurally special page outside the spread sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedPage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FixedPageKind,
    pub content: PageContent,
}

impl FixedPage {
    pub fn new(id: impl Into<String>, kind: FixedPageKind, content: PageContent) -> Self {
        Self {
            id: id.into(),
            kind,
            content,
        }
    }
}

/// A pair of facing interior pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    pub id: String,
    pub left: PageContent,
    pub right: PageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLayout {
    pub cover: FixedPage,
    pub title: FixedPage,
    pub spreads: Vec<Spread>,
    pub ending: FixedPage,
}

impl BookLayout {
    /// An empty book: blank cover, title and ending pages, no spreads
    pub fn empty() -> Self {
        Self {
            cover: FixedPage::new("cover", FixedPageKind::Cover, PageContent::default()),
            title: FixedPage::new("title", FixedPageKind::Title, PageContent::default()),
            spreads: Vec::new(),
            ending: FixedPage::new("ending", FixedPageKind::Ending, PageContent::default()),
        }
    }

    /// Parse the editor's JSON. A literal `null` document is `MissingLayout`.
    pub fn from_json(json: &str) -> Result<Self> {
        let layout: Option<BookLayout> = serde_json::from_str(json)?;
        layout.ok_or(ExportError::MissingLayout)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Title (1) + two pages per spread + ending (1)
    pub fn interior_page_count(&self) -> usize {
        1 + self.spreads.len() * 2 + 1
    }

    /// Check structural invariants the exporters rely on
    pub fn validate(&self) -> Result<()> {
        self.cover.content.check_unique_ids("cover")?;
        self.title.content.check_unique_ids("title")?;
        for (i, spread) in self.spreads.iter().enumerate() {
            spread.left.check_unique_ids(&format!("spread {} left", i + 1))?;
            spread.right.check_unique_ids(&format!("spread {} right", i + 1))?;
        }
        self.ending.content.check_unique_ids("ending")?;
        Ok(())
    }
}
