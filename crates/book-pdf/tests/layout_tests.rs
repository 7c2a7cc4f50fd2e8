use book_pdf::*;

fn create_test_layout(spreads: usize) -> BookLayout {
    let mut layout = BookLayout::empty();
    for i in 0..spreads {
        layout.spreads.push(Spread {
            id: format!("spread-{}", i),
            left: PageContent::default(),
            right: PageContent::default(),
        });
    }
    layout
}

#[test]
fn test_flatten_page_numbers() {
    for spreads in [0, 1, 3, 12] {
        let layout = create_test_layout(spreads);
        let pages = flatten(&layout);
        assert_eq!(pages.len(), 2 * spreads + 2);

        let numbers: Vec<usize> = pages.iter().map(|p| p.absolute_page_number).collect();
        let expected: Vec<usize> = (1..=2 * spreads + 2).collect();
        assert_eq!(numbers, expected);

        assert_eq!(pages[0].kind, PrintPageKind::Title);
        let last = pages.last().unwrap();
        assert_eq!(last.kind, PrintPageKind::Ending);
        assert_eq!(last.absolute_page_number, 2 * spreads + 2);
    }
}

#[test]
fn test_flatten_excludes_cover() {
    let mut layout = create_test_layout(1);
    layout.cover.content = PageContent::with_blocks(vec![Block::text(
        "c",
        0.0,
        0.0,
        100.0,
        40.0,
        TextBlock::new("Cover only"),
    )]);
    assert!(
        flatten(&layout)
            .iter()
            .all(|p| !std::ptr::eq(p.content, &layout.cover.content))
    );
}

#[test]
fn test_flatten_spread_content_order() {
    let mut layout = create_test_layout(2);
    layout.spreads[1].left.text = "second left".to_string();
    layout.spreads[1].right.text = "second right".to_string();

    let pages = flatten(&layout);
    assert_eq!(pages[3].kind, PrintPageKind::Left);
    assert_eq!(pages[3].content.text, "second left");
    assert_eq!(pages[4].kind, PrintPageKind::Right);
    assert_eq!(pages[4].content.text, "second right");
}

#[test]
fn test_interior_page_count() {
    assert_eq!(calculate_interior_page_count(&create_test_layout(0)), 2);
    assert_eq!(calculate_interior_page_count(&create_test_layout(2)), 6);
    assert_eq!(calculate_interior_page_count(&create_test_layout(10)), 22);
}

#[test]
fn test_null_layout_is_missing() {
    assert!(matches!(
        BookLayout::from_json("null"),
        Err(ExportError::MissingLayout)
    ));
}

#[test]
fn test_layout_json_roundtrip() {
    let mut layout = create_test_layout(1);
    layout.spreads[0].left = PageContent::with_blocks(vec![
        Block::image("bg", 0.0, 0.0, 720.0, 540.0, ImageBlock::new("/images/forest.jpg")),
        Block::text("t", 40.0, 400.0, 640.0, 100.0, TextBlock::new("Into the woods")).with_z(2.0),
    ]);

    let json = layout.to_json().unwrap();
    assert!(json.contains("\"type\": \"image\""));
    let parsed = BookLayout::from_json(&json).unwrap();
    assert_eq!(parsed, layout);
}

#[test]
fn test_duplicate_block_ids_rejected() {
    let mut layout = create_test_layout(1);
    layout.spreads[0].right = PageContent::with_blocks(vec![
        Block::text("x", 0.0, 0.0, 10.0, 10.0, TextBlock::new("a")),
        Block::text("x", 20.0, 0.0, 10.0, 10.0, TextBlock::new("b")),
    ]);
    match layout.validate() {
        Err(ExportError::Config(msg)) => assert!(msg.contains("spread 1 right")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_legacy_page_content() {
    let content = PageContent {
        text: "Hello".to_string(),
        image: Some("/images/a.png".to_string()),
        padding: 20.0,
        ..Default::default()
    };
    let blocks = content.effective_blocks();
    assert_eq!(blocks.len(), 2);
    assert!(matches!(blocks[0].kind, BlockKind::Image(_)));
    let text = &blocks[1];
    assert_eq!((text.x, text.y), (20.0, 20.0));
    assert_eq!(text.w, 680.0);
    assert_eq!(content.image_references(), vec!["/images/a.png".to_string()]);
}
