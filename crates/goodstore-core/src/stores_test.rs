use super::*;

const VALID_YAML: &str = r"
stores:
  - id: 10
    name: Green Grocer
    lat: 37.55
    lon: 126.97
    score: 4.1
    categories: [eco-friendly]
  - id: 11
    name: Fair Bakery
    lat: 37.56
    lon: 126.98
    score: 3.9
    categories: [good-price, welfare]
";

#[test]
fn seed_has_six_unique_stores() {
    let catalog = StoreCatalog::seed();
    assert_eq!(catalog.len(), 6);
    let ids: HashSet<_> = catalog.all().iter().map(|s| s.id).collect();
    assert_eq!(ids.len(), 6);
    assert!(StoreCatalog::new(catalog.all().to_vec()).is_ok());
}

#[test]
fn filtered_is_match_any_in_catalog_order() {
    let catalog = StoreCatalog::seed();
    let filter = CategoryFilter::only(CategoryTag::GoodPrice);
    let ids: Vec<i64> = catalog.filtered(&filter).map(|s| s.id.0).collect();
    assert_eq!(ids, vec![1, 4, 6]);

    let filter = CategoryFilter::from_tags([CategoryTag::Welfare, CategoryTag::EcoFriendly]);
    let ids: Vec<i64> = catalog.filtered(&filter).map(|s| s.id.0).collect();
    assert_eq!(ids, vec![2, 3, 4, 5, 6]);
}

#[test]
fn get_returns_none_for_unknown_id() {
    let catalog = StoreCatalog::seed();
    assert_eq!(catalog.get(StoreId(3)).map(|s| s.name.as_str()), Some("신호등찜닭"));
    assert!(catalog.get(StoreId(99)).is_none());
}

#[test]
fn search_matches_substring_case_insensitively() {
    let catalog = parse_store_catalog(VALID_YAML).unwrap();
    let names: Vec<_> = catalog.search("BAKE").iter().map(|s| s.name.clone()).collect();
    assert_eq!(names, vec!["Fair Bakery".to_string()]);
    assert!(catalog.search("   ").is_empty());
}

#[test]
fn parse_store_catalog_accepts_valid_yaml() {
    let catalog = parse_store_catalog(VALID_YAML).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.all()[1].categories.len(), 2);
}

#[test]
fn parse_store_catalog_rejects_duplicate_ids() {
    let yaml = r"
stores:
  - { id: 1, name: A, lat: 1.0, lon: 1.0, score: 1.0, categories: [welfare] }
  - { id: 1, name: B, lat: 1.0, lon: 1.0, score: 1.0, categories: [welfare] }
";
    let err = parse_store_catalog(yaml).unwrap_err();
    assert!(
        matches!(err, ConfigError::Validation(ref msg) if msg.contains("duplicate store id")),
        "got: {err:?}"
    );
}

#[test]
fn parse_store_catalog_rejects_bad_coordinate() {
    let yaml = r"
stores:
  - { id: 1, name: A, lat: 91.0, lon: 1.0, score: 1.0, categories: [welfare] }
";
    let err = parse_store_catalog(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)), "got: {err:?}");
}

#[test]
fn parse_store_catalog_rejects_untagged_store() {
    let yaml = r"
stores:
  - { id: 1, name: A, lat: 1.0, lon: 1.0, score: 1.0, categories: [] }
";
    let err = parse_store_catalog(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)), "got: {err:?}");
}

#[test]
fn parse_store_catalog_rejects_unknown_category() {
    let yaml = r"
stores:
  - { id: 1, name: A, lat: 1.0, lon: 1.0, score: 1.0, categories: [vegan] }
";
    let err = parse_store_catalog(yaml).unwrap_err();
    assert!(
        matches!(&err, ConfigError::Validation(msg) if msg.contains("vegan")),
        "got: {err:?}"
    );
}

#[test]
fn store_deserialization_drops_unknown_tags() {
    let raw = r#"{"id":2,"name":"x","lat":37.5,"lon":127.0,"score":4.0,"categories":["vegan","welfare"]}"#;
    let store: Store = serde_json::from_str(raw).unwrap();
    assert_eq!(
        store.categories.into_iter().collect::<Vec<_>>(),
        vec![CategoryTag::Welfare]
    );
}

#[test]
fn record_lists_unknown_categories() {
    let record = StoreRecord {
        id: 1,
        name: "x".to_owned(),
        lat: 0.0,
        lon: 0.0,
        score: 1.0,
        categories: vec!["good-price".to_owned(), "vegan".to_owned()],
    };
    assert_eq!(record.unknown_categories().collect::<Vec<_>>(), vec!["vegan"]);
}

#[test]
fn store_serializes_as_flat_record() {
    let store = StoreCatalog::seed().get(StoreId(4)).cloned().unwrap();
    let json = serde_json::to_value(&store).unwrap();
    assert_eq!(json["id"], 4);
    assert_eq!(json["lat"], 37.5670);
    assert_eq!(json["lon"], 126.9790);
    assert_eq!(
        json["categories"],
        serde_json::json!(["good-price", "eco-friendly"])
    );
}

#[test]
fn store_deserialization_validates_score() {
    let raw = r#"{"id":1,"name":"x","lat":0.0,"lon":0.0,"score":7.5,"categories":[]}"#;
    assert!(serde_json::from_str::<Store>(raw).is_err());
}

#[test]
fn load_store_catalog_reports_missing_file() {
    let err = load_store_catalog(Path::new("/nonexistent/stores.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::StoresFileIo { .. }), "got: {err:?}");
}

#[test]
fn shipped_catalog_matches_seed() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("stores.yaml");
    let catalog = load_store_catalog(&path).expect("config/stores.yaml should load");

    assert_eq!(catalog.all(), StoreCatalog::seed().all());
}
