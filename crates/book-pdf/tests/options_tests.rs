use book_pdf::*;

#[test]
fn test_default_options_are_valid() {
    let options = ExportOptions::default();
    assert!(options.validate().is_ok());
    assert_eq!(options.quality, Quality::Medium);
    assert!(options.include_spine_text);
    assert!(!options.include_page_numbers);
}

#[test]
fn test_quality_from_str() {
    assert_eq!("low".parse::<Quality>().unwrap(), Quality::Low);
    assert_eq!("High".parse::<Quality>().unwrap(), Quality::High);

    match "ultra".parse::<Quality>() {
        Err(ExportError::InvalidQuality(value)) => assert_eq!(value, "ultra"),
        other => panic!("Expected InvalidQuality, got {:?}", other),
    }

    let err = ExportOptions::default().with_quality_str("best").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid quality setting. Must be low, medium, or high (got \"best\")"
    );
}

#[test]
fn test_quality_tiers() {
    let low = Quality::Low.settings();
    let medium = Quality::Medium.settings();
    let high = Quality::High.settings();
    assert_eq!((low.max_image_width, low.max_image_height), (800, 600));
    assert_eq!((medium.max_image_width, medium.max_image_height), (1200, 900));
    assert_eq!((high.max_image_width, high.max_image_height), (2000, 1500));
    assert!(low.jpeg_quality() < medium.jpeg_quality());
    assert!(medium.jpeg_quality() < high.jpeg_quality());
}

#[test]
fn test_validation_spine_font_size() {
    let options = ExportOptions {
        spine_font_size: 0.0,
        ..Default::default()
    };
    match options.validate() {
        Err(ExportError::Config(msg)) => assert!(msg.contains("Spine font size")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_validation_spine_color() {
    let options = ExportOptions {
        spine_text_color: "not-a-colour".to_string(),
        ..Default::default()
    };
    assert!(matches!(options.validate(), Err(ExportError::Config(_))));

    let options = ExportOptions {
        spine_text_color: "rgb(20, 30, 40)".to_string(),
        ..Default::default()
    };
    assert!(options.validate().is_ok());
}

#[test]
fn test_validation_limits() {
    let mut options = ExportOptions::default();
    options.limits.max_concurrent_images = 0;
    assert!(matches!(options.validate(), Err(ExportError::Config(_))));

    let mut options = ExportOptions::default();
    options.limits.image_timeout_ms = 0;
    assert!(matches!(options.validate(), Err(ExportError::Config(_))));
}

#[tokio::test]
async fn test_save_and_load_options() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.json");

    let options = ExportOptions {
        quality: Quality::High,
        include_page_numbers: true,
        watermark: Some("DRAFT".to_string()),
        spine_font_size: 14.0,
        ..Default::default()
    };
    options.save(&path).await.unwrap();

    let loaded = ExportOptions::load(&path).await.unwrap();
    assert_eq!(loaded, options);
}

#[tokio::test]
async fn test_load_partial_options() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.json");
    tokio::fs::write(&path, r#"{"quality": "low", "includePageNumbers": true}"#)
        .await
        .unwrap();

    let loaded = ExportOptions::load(&path).await.unwrap();
    assert_eq!(loaded.quality, Quality::Low);
    assert!(loaded.include_page_numbers);
    assert_eq!(loaded.spine_font_size, constants::DEFAULT_SPINE_FONT_SIZE);
}

#[tokio::test]
async fn test_load_rejects_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    tokio::fs::write(&path, r#"{"quality": "ultra"}"#).await.unwrap();

    match ExportOptions::load(&path).await {
        Err(ExportError::InvalidQuality(value)) => assert_eq!(value, "ultra"),
        other => panic!("Expected InvalidQuality, got {:?}", other),
    }

    tokio::fs::write(&path, r#"{"quality": "low", "spineFontSize": "big"}"#)
        .await
        .unwrap();
    match ExportOptions::load(&path).await {
        Err(ExportError::Config(msg)) => assert!(msg.starts_with("Failed to parse config")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_quality_deserializes_through_from_str() {
    let quality: Quality = serde_json::from_str(r#""HIGH""#).unwrap();
    assert_eq!(quality, Quality::High);
    assert_eq!(serde_json::to_string(&quality).unwrap(), r#""high""#);

    let err = serde_json::from_str::<Quality>(r#""ultra""#).unwrap_err();
    assert!(err.to_string().starts_with("Invalid quality setting"));
}
