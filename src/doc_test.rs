use super::*;

fn doc_with(items: &[(&str, i64, i64, i64)]) -> (Document, Vec<ItemId>) {
    let mut doc = Document::new();
    let ids = items
        .iter()
        .map(|(c, x, y, s)| doc.add_item(*c, *x, *y, *s).unwrap())
        .collect();
    (doc, ids)
}

// =============================================================
// round_half_even
// =============================================================

#[test]
fn round_half_even_ties_go_to_even() {
    assert_eq!(round_half_even(0.5), 0);
    assert_eq!(round_half_even(1.5), 2);
    assert_eq!(round_half_even(2.5), 2);
    assert_eq!(round_half_even(-0.5), 0);
    assert_eq!(round_half_even(-1.5), -2);
    assert_eq!(round_half_even(-2.5), -2);
}

#[test]
fn round_half_even_non_ties_go_to_nearest() {
    assert_eq!(round_half_even(2.4), 2);
    assert_eq!(round_half_even(2.6), 3);
    assert_eq!(round_half_even(-2.6), -3);
}

#[test]
fn round_half_even_non_finite_is_zero() {
    assert_eq!(round_half_even(f64::NAN), 0);
    assert_eq!(round_half_even(f64::INFINITY), 0);
}

// =============================================================
// add_item / ids
// =============================================================

#[test]
fn new_document_is_empty() {
    let doc = Document::new();
    assert!(doc.is_empty());
    assert_eq!(doc.len(), 0);
    assert!(doc.background_url().is_none());
}

#[test]
fn add_item_appends_in_order() {
    let (doc, ids) = doc_with(&[("⭐️", 0, 0, 40), ("🍎", 10, -10, 20)]);
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.items()[0].id, ids[0]);
    assert_eq!(doc.items()[1].id, ids[1]);
    assert_eq!(doc.items()[1].content, "🍎");
    assert_eq!(doc.items()[1].x, 10);
    assert_eq!(doc.items()[1].y, -10);
    assert_eq!(doc.items()[1].size, 20);
}

#[test]
fn ids_are_unique() {
    let (doc, ids) = doc_with(&[("a", 0, 0, 1), ("b", 0, 0, 1), ("c", 0, 0, 1)]);
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), 3);
    assert_eq!(doc.len(), 3);
}

#[test]
fn removed_ids_are_never_reused() {
    let (mut doc, ids) = doc_with(&[("a", 0, 0, 1), ("b", 0, 0, 1)]);
    doc.remove_item(ids[1]).unwrap();
    let fresh = doc.add_item("c", 0, 0, 1).unwrap();
    assert_ne!(fresh, ids[1]);
    assert_ne!(fresh, ids[0]);
}

#[test]
fn interleaved_add_remove_keeps_ids_unique_and_stable() {
    let mut doc = Document::new();
    let mut live: Vec<ItemId> = Vec::new();
    let mut ever: HashSet<ItemId> = HashSet::new();
    for round in 0..50_i64 {
        let id = doc.add_item("x", round, -round, 10).unwrap();
        assert!(ever.insert(id), "id {id} handed out twice");
        live.push(id);
        if round % 3 == 0 {
            let victim = live.remove(0);
            doc.remove_item(victim).unwrap();
        }
    }
    let in_doc: Vec<ItemId> = doc.items().iter().map(|i| i.id).collect();
    assert_eq!(in_doc, live);
}

// =============================================================
// move_item
// =============================================================

#[test]
fn move_item_rounds_half_to_even() {
    let (mut doc, ids) = doc_with(&[("a", 0, 0, 40)]);
    doc.move_item(ids[0], 2.5, -3.5).unwrap();
    let item = doc.item(ids[0]).unwrap();
    assert_eq!((item.x, item.y), (2, -4));
}

#[test]
fn move_then_inverse_restores_position() {
    let (mut doc, ids) = doc_with(&[("a", 7, -3, 40)]);
    for (dx, dy) in [(2.5, 0.5), (13.7, -8.2), (-0.5, 1.5), (100.49, -100.51)] {
        doc.move_item(ids[0], dx, dy).unwrap();
        doc.move_item(ids[0], -dx, -dy).unwrap();
        let item = doc.item(ids[0]).unwrap();
        assert_eq!((item.x, item.y), (7, -3), "drift after ({dx}, {dy})");
    }
}

#[test]
fn move_missing_item_is_not_found() {
    let mut doc = Document::new();
    let err = doc.move_item(ItemId(99), 1.0, 1.0).unwrap_err();
    assert_eq!(err, EditorError::NotFound { id: ItemId(99) });
}

// =============================================================
// scale_item
// =============================================================

#[test]
fn scale_item_rounds_half_to_even() {
    let (mut doc, ids) = doc_with(&[("a", 0, 0, 5), ("b", 0, 0, 7)]);
    doc.scale_item(ids[0], 0.5).unwrap();
    doc.scale_item(ids[1], 0.5).unwrap();
    assert_eq!(doc.item(ids[0]).unwrap().size, 2);
    assert_eq!(doc.item(ids[1]).unwrap().size, 4);
}

#[test]
fn scale_item_does_not_clamp() {
    let (mut doc, ids) = doc_with(&[("a", 0, 0, 40)]);
    doc.scale_item(ids[0], 0.001).unwrap();
    assert_eq!(doc.item(ids[0]).unwrap().size, 0);
}

#[test]
fn scale_item_rejects_non_positive_factor() {
    let (mut doc, ids) = doc_with(&[("a", 0, 0, 40)]);
    for factor in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = doc.scale_item(ids[0], factor).unwrap_err();
        assert!(matches!(err, EditorError::InvalidGeometry(_)));
    }
    assert_eq!(doc.item(ids[0]).unwrap().size, 40);
}

#[test]
fn scale_missing_item_is_not_found() {
    let mut doc = Document::new();
    assert!(matches!(doc.scale_item(ItemId(3), 2.0), Err(EditorError::NotFound { .. })));
}

// =============================================================
// remove_item
// =============================================================

#[test]
fn remove_item_returns_it() {
    let (mut doc, ids) = doc_with(&[("a", 1, 2, 3)]);
    let removed = doc.remove_item(ids[0]).unwrap();
    assert_eq!(removed.content, "a");
    assert!(doc.is_empty());
}

#[test]
fn mutations_after_remove_are_no_ops() {
    let (mut doc, ids) = doc_with(&[("a", 1, 2, 3), ("b", 4, 5, 6)]);
    doc.remove_item(ids[0]).unwrap();
    let before = doc.clone();
    assert!(doc.move_item(ids[0], 5.0, 5.0).is_err());
    assert!(doc.scale_item(ids[0], 2.0).is_err());
    assert!(doc.remove_item(ids[0]).is_err());
    assert_eq!(doc, before);
}

// =============================================================
// background / from_parts
// =============================================================

#[test]
fn set_background_url_replaces() {
    let mut doc = Document::new();
    let url = Url::parse("https://example.test/a.png").unwrap();
    doc.set_background_url(Some(url.clone()));
    assert_eq!(doc.background_url(), Some(&url));
    doc.set_background_url(None);
    assert!(doc.background_url().is_none());
}

#[test]
fn from_parts_drops_duplicate_ids() {
    let item = |id, content: &str| Item { id: ItemId(id), content: content.into(), x: 0, y: 0, size: 10 };
    let doc = Document::from_parts(vec![item(1, "a"), item(1, "b"), item(2, "c")], None, 0);
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.item(ItemId(1)).unwrap().content, "a");
}

#[test]
fn from_parts_raises_counter_past_existing_ids() {
    let item = Item { id: ItemId(41), content: "a".into(), x: 0, y: 0, size: 10 };
    let mut doc = Document::from_parts(vec![item], None, 3);
    assert_eq!(doc.next_id(), 42);
    assert_eq!(doc.add_item("b", 0, 0, 10).unwrap(), ItemId(42));
}

#[test]
fn from_parts_keeps_higher_counter() {
    let doc = Document::from_parts(Vec::new(), None, 100);
    assert_eq!(doc.next_id(), 100);
}

#[test]
fn item_location_and_font_size() {
    let (doc, ids) = doc_with(&[("a", -4, 9, 40)]);
    let item = doc.item(ids[0]).unwrap();
    assert_eq!(item.location(), Point::new(-4.0, 9.0));
    assert!((item.font_size() - 40.0).abs() < f64::EPSILON);
}

#[test]
fn from_parts_drops_item_with_last_possible_id() {
    let max = Item { id: ItemId(u64::MAX), content: "a".into(), x: 0, y: 0, size: 10 };
    let ok = Item { id: ItemId(7), content: "b".into(), x: 0, y: 0, size: 10 };
    let mut doc = Document::from_parts(vec![max, ok], None, 0);
    assert_eq!(doc.len(), 1);
    assert!(!doc.contains(ItemId(u64::MAX)));
    assert_eq!(doc.next_id(), 8);

    let fresh = doc.add_item("c", 0, 0, 10).unwrap();
    let occurrences = doc.items().iter().filter(|i| i.id == fresh).count();
    assert_eq!(occurrences, 1);
}

#[test]
fn add_item_fails_when_ids_run_out() {
    let mut doc = Document::from_parts(Vec::new(), None, u64::MAX);
    let err = doc.add_item("a", 0, 0, 10).unwrap_err();
    assert_eq!(err, EditorError::IdsExhausted);
    assert_eq!(err.error_code(), "E_IDS_EXHAUSTED");
    assert!(doc.is_empty());
    assert_eq!(doc.next_id(), u64::MAX);
}
