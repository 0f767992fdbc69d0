use kanban_core::model::board::normalize_text;
use kanban_core::{
    BoardValidationError, Card, ChecklistItem, Dashboard, MoveRequest, Positioned,
    PositionedCollection, StructuralClone, Table, TableHeader,
};
use serde_json::json;
use uuid::Uuid;

#[test]
fn titles_are_trimmed_and_whitespace_collapsed() {
    let card = Card::new("  Fix \t the\n  login  ").unwrap();
    assert_eq!(card.title(), "Fix the login");

    assert_eq!(normalize_text("card title", " a  b ").unwrap(), "a b");
}

#[test]
fn blank_titles_are_rejected_per_field() {
    assert_eq!(
        Dashboard::new("   ").unwrap_err(),
        BoardValidationError::Blank("dashboard title")
    );
    assert_eq!(
        Card::new("\n\t").unwrap_err(),
        BoardValidationError::Blank("card title")
    );
    assert_eq!(
        ChecklistItem::new("").unwrap_err(),
        BoardValidationError::Blank("checklist text")
    );
}

#[test]
fn nil_identities_are_rejected_on_restore() {
    let err = TableHeader::restore(Uuid::nil(), "Todo", 0).unwrap_err();
    assert_eq!(err, BoardValidationError::NilId("table id"));

    let err = Table::new(Uuid::nil(), "Todo").unwrap_err();
    assert_eq!(err, BoardValidationError::NilId("dashboard id"));
}

#[test]
fn restored_aggregate_must_own_its_collection() {
    let table_id = Uuid::new_v4();
    let foreign = PositionedCollection::<Card>::new(Uuid::new_v4());

    let err = Table::restore(table_id, Uuid::new_v4(), "Todo", foreign.clone()).unwrap_err();

    assert_eq!(
        err,
        BoardValidationError::OwnerMismatch {
            expected: table_id,
            actual: foreign.owner(),
        }
    );
}

#[test]
fn new_aggregates_own_their_empty_collections() {
    let dashboard = Dashboard::new("Roadmap").unwrap();
    let table = Table::new(dashboard.id(), "Todo").unwrap();
    let card = Card::new("Write docs").unwrap();

    assert_eq!(dashboard.tables().owner(), dashboard.id());
    assert_eq!(table.cards().owner(), table.id());
    assert_eq!(card.checklist().owner(), card.id());
    assert_eq!(table.header().id(), table.id());
    assert_eq!(table.header().title(), "Todo");
}

#[test]
fn structural_clone_of_card_is_deep() {
    let mut card = Card::new("Ship").unwrap();
    card.description = Some("v1".to_string());
    card.due_at = Some(1_700_000_000_000);
    card.checklist_mut()
        .append(ChecklistItem::new("tag release").unwrap())
        .unwrap();

    let clone = card.structural_clone();

    assert_ne!(clone.id(), card.id());
    assert_eq!(clone.title(), card.title());
    assert_eq!(clone.description, card.description);
    assert_eq!(clone.due_at, card.due_at);
    assert_eq!(clone.checklist().owner(), clone.id());
    assert_ne!(clone.checklist().ids(), card.checklist().ids());
}

#[test]
fn move_request_parse_validates_raw_input() {
    let source = Uuid::new_v4();
    let destination = Uuid::new_v4();
    let item = Uuid::new_v4();

    let request = MoveRequest::parse(
        &format!(" {source} "),
        &destination.to_string(),
        &item.to_string(),
        3,
    )
    .unwrap();
    assert_eq!(request.source(), source);
    assert_eq!(request.position(), 3);
    assert!(!request.is_within_owner());

    let err = MoveRequest::parse("nope", &destination.to_string(), &item.to_string(), 0)
        .unwrap_err();
    assert!(matches!(
        err,
        BoardValidationError::MalformedId { field: "source owner id", .. }
    ));

    let err = MoveRequest::parse(
        &source.to_string(),
        &destination.to_string(),
        &item.to_string(),
        -1,
    )
    .unwrap_err();
    assert_eq!(err, BoardValidationError::NegativePosition(-1));

    let err = MoveRequest::new(source, destination, Uuid::nil(), 0).unwrap_err();
    assert_eq!(err, BoardValidationError::NilId("item id"));
}

#[test]
fn card_serializes_checklist_as_ordered_array() {
    let mut card = Card::new("Ship").unwrap();
    let first = ChecklistItem::new("build").unwrap();
    let second = ChecklistItem::new("deploy").unwrap();
    card.checklist_mut().append(first.clone()).unwrap();
    card.checklist_mut().append(second.clone()).unwrap();
    card.checklist_mut().update_position(second.id(), 0).unwrap();

    let value = serde_json::to_value(&card).unwrap();

    assert_eq!(value["title"], json!("Ship"));
    assert_eq!(value["description"], json!(null));
    assert_eq!(value["tag_ids"], json!([]));
    assert_eq!(value["position"], json!(0));
    assert_eq!(
        value["checklist"],
        json!([
            {
                "id": second.id().to_string(),
                "text": "deploy",
                "is_checked": false,
                "position": 0
            },
            {
                "id": first.id().to_string(),
                "text": "build",
                "is_checked": false,
                "position": 1
            }
        ])
    );
}
