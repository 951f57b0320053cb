use std::path::Path;

use txe_core::{
    Catalogue, Error, FieldSet, Flag, ItemField, ItemPatch, LocalFs, Patch, Record, ScalarField,
    Session, TraderDocument, TraderHeader,
};

fn full_record(name: &str, n: i32) -> Record {
    let mut r = Record::new(name);
    for (i, f) in ScalarField::ALL.into_iter().enumerate() {
        r.set_scalar(f, (n + i as i32).to_string());
    }
    r.set_scalar(ScalarField::Quantmin, "-1");
    for (i, f) in Flag::ALL.into_iter().enumerate() {
        r.set_flag(f, (i % 2).to_string());
    }
    r.replace_categories(["Food".to_string(), "Tools".to_string()]);
    r.replace_usages(["Town".to_string(), "Farm".to_string()]);
    r.replace_values(["Tier1".to_string()]);
    r
}

fn write_types(dir: &Path, records: &[Record]) -> std::path::PathBuf {
    let mut store = Catalogue::new();
    for r in records {
        store.insert(r.clone());
    }
    let p = dir.join("types.xml");
    store.write(&LocalFs, &p).unwrap();
    p
}

#[test]
fn serialize_then_parse_reproduces_records() {
    let records = [
        full_record("Apple", 1),
        full_record("Banana & Co", 20),
        Record::new("Empty"),
    ];
    let dir = tempfile::tempdir().unwrap();
    let p = write_types(dir.path(), &records);
    let text = std::fs::read_to_string(&p).unwrap();
    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<types>\n"));
    let back = Catalogue::load(&text).unwrap();
    assert_eq!(back.len(), records.len());
    for r in &records {
        assert_eq!(back.find(r.name()).unwrap(), r);
    }
}

#[test]
fn find_after_load_hits_present_names_only() {
    let dir = tempfile::tempdir().unwrap();
    let p = write_types(dir.path(), &[full_record("Apple", 1), full_record("Rope", 2)]);
    let mut session = Session::local();
    let names: Vec<String> = session
        .open_catalogue(&p)
        .unwrap()
        .all_names()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(names, ["Apple", "Rope"]);
    for n in &names {
        assert_eq!(session.find(n).unwrap().name(), n);
    }
    assert!(matches!(session.find("Ghost"), Err(Error::RecordNotFound(_))));
}

#[test]
fn malformed_document_is_distinct_from_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.xml");
    std::fs::write(&bad, "<types><type name=\"A\"></typo></types>").unwrap();
    let mut session = Session::local();
    assert!(matches!(
        session.open_catalogue(&bad),
        Err(Error::MalformedDocument(_))
    ));
    assert!(matches!(
        session.open_catalogue(dir.path().join("missing.xml")),
        Err(Error::SourceUnreadable { .. })
    ));
    assert!(session.catalogue().is_none());
}

#[test]
fn single_edit_persists_and_replaces_collections() {
    let dir = tempfile::tempdir().unwrap();
    let p = write_types(dir.path(), &[full_record("Apple", 1)]);
    let mut session = Session::local();
    session.open_catalogue(&p).unwrap();

    session
        .edit_record("Apple", &Patch::new().categories(["Food"]))
        .unwrap();
    session
        .edit_record(
            "Apple",
            &Patch::new()
                .categories(Vec::<String>::new())
                .scalar(ScalarField::Quantmin, "-1"),
        )
        .unwrap();

    let on_disk = Catalogue::load(&std::fs::read_to_string(&p).unwrap()).unwrap();
    let apple = on_disk.find("Apple").unwrap();
    assert!(apple.categories().is_empty());
    assert_eq!(apple.usages(), ["Town", "Farm"]);
    assert_eq!(apple.scalar(ScalarField::Quantmin), "-1");
}

#[test]
fn rejected_edit_does_not_touch_memory_or_disk() {
    let dir = tempfile::tempdir().unwrap();
    let p = write_types(dir.path(), &[full_record("Apple", 1)]);
    let before = std::fs::read(&p).unwrap();
    let mut session = Session::local();
    session.open_catalogue(&p).unwrap();
    let err = session
        .edit_record("Apple", &Patch::new().scalar(ScalarField::Nominal, "abc"))
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(session.find("Apple").unwrap().scalar(ScalarField::Nominal), "1");
    assert_eq!(std::fs::read(&p).unwrap(), before);
}

#[test]
fn bulk_edit_skips_missing_and_writes_found() {
    let dir = tempfile::tempdir().unwrap();
    let p = write_types(
        dir.path(),
        &[full_record("Apple", 1), full_record("Banana", 2), full_record("Cherry", 3)],
    );
    let mut session = Session::local();
    session.open_catalogue(&p).unwrap();
    let patch = Patch::new()
        .scalar(ScalarField::Nominal, "42")
        .flag(Flag::Deloot, "1")
        .values(["Tier4"]);
    let report = session
        .bulk_edit(&["Apple", "Banana", "Ghost"], &patch, None)
        .unwrap();
    assert_eq!(report.applied, ["Apple", "Banana"]);
    assert_eq!(report.missing, ["Ghost"]);

    let on_disk = Catalogue::load(&std::fs::read_to_string(&p).unwrap()).unwrap();
    for n in ["Apple", "Banana"] {
        let r = on_disk.find(n).unwrap();
        assert_eq!(r.scalar(ScalarField::Nominal), "42");
        assert_eq!(r.flag(Flag::Deloot), "1");
        assert_eq!(r.values(), ["Tier4"]);
    }
    assert_eq!(on_disk.find("Cherry").unwrap(), &full_record("Cherry", 3));
}

#[test]
fn generate_writes_collapsed_catalogue() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("types.xml");
    let mut fields = FieldSet::generator_defaults();
    for f in [
        ScalarField::Nominal,
        ScalarField::Lifetime,
        ScalarField::Restock,
        ScalarField::Min,
    ] {
        fields.set_scalar(f, "5");
    }
    fields.usages = vec!["Village".into()];
    let names = txe_core::split_name_list("Rope, Rope\nKnife");
    let mut session = Session::local();
    let mut ticks = 0;
    let mut sink = |_: usize, _: usize| ticks += 1;
    let dups = session
        .generate_catalogue(&names, &fields, &out, Some(&mut sink))
        .unwrap();
    assert_eq!(dups, ["Rope"]);
    assert_eq!(ticks, 3);

    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(text.matches("<type name=").count(), 2);
    assert!(text.contains("<usage name=\"Village\"/>"));
    assert!(text.contains("count_in_map=\"1\""));
    assert_eq!(session.catalogue().unwrap().all_names(), ["Rope", "Knife"]);
}

#[test]
fn trader_projection_and_edit_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let types = write_types(
        dir.path(),
        &[Record::new("A"), full_record("B", 7), Record::new("C")],
    );
    let header = TraderHeader {
        display_name: "Town".into(),
        icon: "Deliver".into(),
        color: "FFFFFFFF".into(),
        init_stock_percent: "75".into(),
    };
    let mut session = Session::local();
    let doc = session.project_trader_file(&types, &header).unwrap();
    assert_eq!(doc.items.len(), 3);
    assert_eq!(doc.class_names(), ["A", "B", "C"]);
    for item in &doc.items {
        assert_eq!(item.max_price_threshold, 1000);
        assert_eq!(item.min_price_threshold, 500);
        assert_eq!(item.sell_price_percent, -1);
        assert_eq!(item.max_stock_threshold, 50);
        assert_eq!(item.min_stock_threshold, 10);
        assert_eq!(item.quantity_percent, -1);
        assert!(item.spawn_attachments.is_empty() && item.variants.is_empty());
    }

    let trader_path = dir.path().join("trader.json");
    session.save_trader(doc, &trader_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&trader_path).unwrap()).unwrap();
    assert_eq!(json["m_Version"], 8);
    assert_eq!(json["InitStockPercent"], 75);
    assert_eq!(json["Items"][1]["ClassName"], "B");

    let mut session = Session::local();
    session.open_trader(&trader_path).unwrap();
    let new_header = TraderHeader {
        display_name: "Village".into(),
        ..session.trader().unwrap().header()
    };
    let patch = ItemPatch::new()
        .set(ItemField::SellPricePercent, "40")
        .set(ItemField::MaxStockThreshold, "5");
    session
        .edit_trader(Some(&new_header), Some(("B", &patch)))
        .unwrap();
    let reloaded =
        TraderDocument::from_json(&std::fs::read(&trader_path).unwrap()).unwrap();
    assert_eq!(reloaded.display_name, "Village");
    let b = reloaded.item("B").unwrap();
    assert_eq!(b.sell_price_percent, 40);
    assert_eq!(b.max_stock_threshold, 5);
    assert_eq!(reloaded.item("A").unwrap().max_stock_threshold, 50);
}

#[test]
fn trader_projection_reports_unreadable_source() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("types.xml");
    std::fs::write(&broken, "<types><type name=\"A\">").unwrap();
    let session = Session::local();
    assert!(matches!(
        session.project_trader_file(&broken, &TraderHeader::default()),
        Err(Error::SourceUnreadable { .. })
    ));
    let header = TraderHeader {
        init_stock_percent: "many".into(),
        ..TraderHeader::default()
    };
    assert!(matches!(
        session.project_trader_file(&broken, &header),
        Err(Error::Validation { .. })
    ));
}
