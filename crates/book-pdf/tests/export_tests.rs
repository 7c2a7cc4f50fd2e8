use base64::Engine;
use book_pdf::*;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object};
use std::io::Cursor;

fn text_page(id: &str, text: &str) -> PageContent {
    PageContent::with_blocks(vec![Block::text(
        id,
        100.0,
        100.0,
        300.0,
        60.0,
        TextBlock::new(text),
    )])
}

fn create_test_layout(spreads: usize) -> BookLayout {
    let mut layout = BookLayout::empty();
    layout.cover.content = PageContent::with_blocks(vec![
        Block::text("title", 100.0, 100.0, 400.0, 80.0, TextBlock::new("My Book")),
        Block::text("author", 100.0, 300.0, 400.0, 40.0, TextBlock::new("By Jane Doe")),
    ]);
    layout.title.content = text_page("t", "My Book");
    for i in 0..spreads {
        layout.spreads.push(Spread {
            id: format!("spread-{}", i),
            left: text_page(&format!("l{}", i), "Once upon a time"),
            right: text_page(&format!("r{}", i), "The end of the day"),
        });
    }
    layout.ending.content = text_page("e", "The End");
    layout
}

fn png_data_url(width: u32, height: u32) -> String {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 80, 40]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&bytes)
    )
}

fn box_of(doc: &Document, page: u32, key: &[u8]) -> Vec<f32> {
    let pages = doc.get_pages();
    let dict = doc.get_object(pages[&page]).unwrap().as_dict().unwrap();
    dict.get(key)
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o.as_float().unwrap())
        .collect()
}

#[tokio::test]
async fn test_export_both_two_spreads() {
    let layout = create_test_layout(2);
    let result = export_both(Some(&layout), &ExportOptions::default())
        .await
        .unwrap();

    assert_eq!(result.internal_page_count(), 6);
    let expected_spine = SpineCalculator::default().spine_width_points(6).unwrap();
    assert!((result.cover_spine_width() - expected_spine).abs() < 1e-4);

    let interior = Document::load_mem(&result.internal_pages.bytes).unwrap();
    assert_eq!(interior.get_pages().len(), 6);

    let cover = Document::load_mem(&result.cover.bytes).unwrap();
    assert_eq!(cover.get_pages().len(), 1);
    let media = box_of(&cover, 1, b"MediaBox");
    assert!((media[2] - result.cover_total_width()).abs() < 0.01);
}

#[tokio::test]
async fn test_interior_pages_carry_trim_and_bleed() {
    let layout = create_test_layout(1);
    let exporter = InternalPagesExporter::default();
    let pdf = exporter
        .export(Some(&layout), &ExportOptions::default())
        .await
        .unwrap();
    assert_eq!(pdf.page_count, 4);

    let page = exporter.page_config();
    let doc = Document::load_mem(&pdf.bytes).unwrap();
    for number in 1..=4 {
        let media = box_of(&doc, number, b"MediaBox");
        let trim = box_of(&doc, number, b"TrimBox");
        assert!((media[2] - page.media_width()).abs() < 0.01);
        assert!((media[3] - page.media_height()).abs() < 0.01);
        assert!((trim[0] - page.bleed_margin).abs() < 0.01);
        assert!((trim[2] - trim[0] - page.width).abs() < 0.01);
    }
}

#[tokio::test]
async fn test_book_without_spreads() {
    let layout = create_test_layout(0);
    let result = export_both(Some(&layout), &ExportOptions::default())
        .await
        .unwrap();
    assert_eq!(result.internal_page_count(), 2);
    let expected_spine = SpineCalculator::default().spine_width_points(2).unwrap();
    assert!((result.cover_spine_width() - expected_spine).abs() < 1e-4);
}

#[tokio::test]
async fn test_missing_layout() {
    let options = ExportOptions::default();
    assert!(matches!(
        export_both(None, &options).await,
        Err(ExportError::MissingLayout)
    ));
    assert!(matches!(
        InternalPagesExporter::default().export(None, &options).await,
        Err(ExportError::MissingLayout)
    ));
    assert!(matches!(
        CoverExporter::default().export(None, 6, &options).await,
        Err(ExportError::MissingLayout)
    ));
}

#[tokio::test]
async fn test_cover_rejects_invalid_page_count() {
    let layout = create_test_layout(1);
    let options = ExportOptions::default();
    let exporter = CoverExporter::default();

    match exporter.export(Some(&layout), 0, &options).await {
        Err(ExportError::InvalidPageCount(0)) => {}
        other => panic!("Expected InvalidPageCount, got {:?}", other.map(|c| c.spine_width)),
    }
    assert!(matches!(
        exporter.export(Some(&layout), -4, &options).await,
        Err(ExportError::InvalidPageCount(-4))
    ));
}

#[tokio::test]
async fn test_unresolvable_image_becomes_placeholder() {
    let mut layout = create_test_layout(1);
    layout.spreads[0].left = PageContent::with_blocks(vec![Block::image(
        "pic",
        0.0,
        0.0,
        720.0,
        540.0,
        ImageBlock::new("/images/x.png"),
    )]);

    let pdf = InternalPagesExporter::default()
        .export(Some(&layout), &ExportOptions::default())
        .await
        .unwrap();
    assert_eq!(pdf.page_count, 4);

    let placeholders: Vec<_> = pdf
        .warnings
        .iter()
        .filter_map(|w| match w {
            ExportWarning::ImagePlaceholder { page, block_id, .. } => Some((*page, block_id.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(placeholders, vec![(2, "pic")]);
}

#[tokio::test]
async fn test_data_url_image_is_embedded() {
    let mut layout = create_test_layout(1);
    layout.spreads[0].right = PageContent::with_blocks(vec![Block::image(
        "pic",
        0.0,
        0.0,
        720.0,
        540.0,
        ImageBlock::new(png_data_url(64, 48)),
    )]);

    let pdf = InternalPagesExporter::default()
        .export(Some(&layout), &ExportOptions::default())
        .await
        .unwrap();
    assert!(!pdf
        .warnings
        .iter()
        .any(|w| matches!(w, ExportWarning::ImagePlaceholder { .. })));

    let doc = Document::load_mem(&pdf.bytes).unwrap();
    let has_image = doc.objects.values().any(|object| match object {
        Object::Stream(stream) => stream
            .dict
            .get(b"Subtype")
            .and_then(|s| s.as_name())
            .map(|name| name == b"Image")
            .unwrap_or(false),
        _ => false,
    });
    assert!(has_image);
}

#[tokio::test]
async fn test_asset_directory_images() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("images")).unwrap();
    image::RgbImage::from_pixel(32, 32, image::Rgb([10, 120, 200]))
        .save(dir.path().join("images/sky.png"))
        .unwrap();

    let mut layout = create_test_layout(1);
    layout.cover.content.blocks.as_mut().unwrap().push(
        Block::image("bg", 0.0, 0.0, 720.0, 540.0, ImageBlock::new("/images/sky.png")).with_z(-1.0),
    );

    let exporter = BookExporter::new(AssetDirectory::new(dir.path()));
    let result = exporter
        .export(Some(&layout), &ExportOptions::default())
        .await
        .unwrap();
    assert_eq!(result.warnings().count(), 0);
}

#[tokio::test]
async fn test_page_numbers_and_watermark() {
    let layout = create_test_layout(2);
    let options = ExportOptions {
        include_page_numbers: true,
        watermark: Some("PROOF".to_string()),
        ..Default::default()
    };
    let pdf = InternalPagesExporter::default()
        .export(Some(&layout), &options)
        .await
        .unwrap();

    let doc = Document::load_mem(&pdf.bytes).unwrap();
    let pages = doc.get_pages();
    let content = doc.get_page_content(pages[&6]).unwrap();
    let text = String::from_utf8_lossy(&content);
    assert!(text.contains("(6)"));
    assert!(text.contains("(PROOF)"));
}

#[tokio::test]
async fn test_spine_text_can_be_disabled() {
    let layout = create_test_layout(2);
    let with_text = CoverExporter::default()
        .export(Some(&layout), 6, &ExportOptions::default())
        .await
        .unwrap();
    let without_text = CoverExporter::default()
        .export(
            Some(&layout),
            6,
            &ExportOptions {
                include_spine_text: false,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let spine_content = |bytes: &[u8]| {
        let doc = Document::load_mem(bytes).unwrap();
        let pages = doc.get_pages();
        String::from_utf8_lossy(&doc.get_page_content(pages[&1]).unwrap()).into_owned()
    };
    assert!(spine_content(&with_text.bytes).contains("(Jane Doe)"));
    assert!(!spine_content(&without_text.bytes).contains("(Jane Doe)"));
    assert_eq!(with_text.spine_width, without_text.spine_width);
}

#[tokio::test]
async fn test_export_report() {
    let layout = create_test_layout(2);
    let result = export_both(Some(&layout), &ExportOptions::default()).await;
    let report = ExportReport::from_result(&result);
    assert!(report.success);
    assert_eq!(report.internal_page_count, Some(6));
    assert!(report.error.is_none());

    let failed = ExportReport::from_result(&export_both(None, &ExportOptions::default()).await);
    assert!(!failed.success);
    assert_eq!(
        failed.error.as_deref(),
        Some("Book layout is required for PDF generation")
    );

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["internalPageCount"], 6);
}

fn page_operations(bytes: &[u8], page: u32) -> Vec<Operation> {
    let doc = Document::load_mem(bytes).unwrap();
    let pages = doc.get_pages();
    Content::decode(&doc.get_page_content(pages[&page]).unwrap())
        .unwrap()
        .operations
}

/// (x, y, font size, text) of every rotated line
fn rotated_lines(ops: &[Operation]) -> Vec<(f32, f32, f32, String)> {
    let mut size = 0.0;
    let mut position = None;
    let mut lines = Vec::new();
    for op in ops {
        match op.operator.as_str() {
            "Tf" => size = op.operands[1].as_float().unwrap(),
            "Tm" => {
                position = Some((
                    op.operands[4].as_float().unwrap(),
                    op.operands[5].as_float().unwrap(),
                ))
            }
            "Tj" => {
                if let (Some((x, y)), Object::String(bytes, _)) = (position.take(), &op.operands[0]) {
                    lines.push((x, y, size, String::from_utf8_lossy(bytes).into_owned()));
                }
            }
            _ => {}
        }
    }
    lines
}

async fn assert_spine_text_inside_spine(interior_page_count: i64) -> f32 {
    let layout = create_test_layout(2);
    let exporter = CoverExporter::default();
    let cover = exporter
        .export(Some(&layout), interior_page_count, &ExportOptions::default())
        .await
        .unwrap();
    let geometry = exporter.geometry(interior_page_count).unwrap();
    let spine = geometry.spine;
    let engine = TextLayoutEngine::default();

    let lines = rotated_lines(&page_operations(&cover.bytes, 1));
    assert_eq!(
        lines.iter().map(|l| l.3.as_str()).collect::<Vec<_>>(),
        ["My Book", "Jane Doe"]
    );
    for (x, y, size, text) in &lines {
        // Glyphs run from the descender to the ascender across the spine
        assert!(x - 0.2 * size >= spine.x - 1e-3, "{} starts before the spine", text);
        assert!(x + 0.8 * size <= spine.right() + 1e-3, "{} ends past the spine", text);

        // and downward from the top along it
        let top = geometry.height - spine.y;
        let length = engine.estimated_width(text, *size, "Inter");
        assert!(*y <= top + 1e-3);
        assert!(y - length >= top - spine.height - 1e-3);
    }
    lines[0].2
}

#[tokio::test]
async fn test_spine_text_fits_thin_spine() {
    let size = assert_spine_text_inside_spine(6).await;
    assert!(size < constants::DEFAULT_SPINE_FONT_SIZE);
}

#[tokio::test]
async fn test_spine_text_keeps_size_on_thick_spine() {
    let size = assert_spine_text_inside_spine(300).await;
    assert_eq!(size, constants::DEFAULT_SPINE_FONT_SIZE);
}

#[tokio::test]
async fn test_back_board_repeats_front_content() {
    let layout = create_test_layout(2);
    let options = ExportOptions {
        include_spine_text: false,
        ..Default::default()
    };
    let exporter = CoverExporter::default();
    let cover = exporter.export(Some(&layout), 6, &options).await.unwrap();
    let geometry = exporter.geometry(6).unwrap();

    let ops = page_operations(&cover.bytes, 1);
    let mut title_xs = Vec::new();
    let mut last_x = 0.0;
    for op in &ops {
        match op.operator.as_str() {
            "Td" => last_x = op.operands[0].as_float().unwrap(),
            "Tj" if matches!(&op.operands[0], Object::String(bytes, _) if bytes == b"My Book") => {
                title_xs.push(last_x)
            }
            _ => {}
        }
    }
    assert_eq!(title_xs.len(), 2);
    let offset = title_xs[1] - title_xs[0];
    assert!((offset - (geometry.front.x - geometry.back.x)).abs() < 1e-3);
}
