use kanban_core::{
    copy_all, move_all, move_one, Card, ChecklistItem, MoveError, MoveOutcome, PositionError,
    Positioned, PositionedCollection,
};
use proptest::prelude::*;
use uuid::Uuid;

fn table(titles: &[&str]) -> PositionedCollection<Card> {
    PositionedCollection::from_ordered(
        Uuid::new_v4(),
        titles.iter().map(|title| Card::new(title).unwrap()),
    )
    .unwrap()
}

fn titles(cards: &PositionedCollection<Card>) -> Vec<String> {
    cards.iter().map(|card| card.title().to_string()).collect()
}

#[test]
fn move_one_into_empty_table_creates_clone_with_new_identity() {
    let mut table_a = table(&["CardX"]);
    let mut table_b = table(&[]);
    let card_x = table_a.ids()[0];

    let outcome = move_one(&mut table_a, &mut table_b, card_x, 0).unwrap();

    assert!(table_a.is_empty());
    assert_eq!(table_b.len(), 1);
    let clone = table_b.iter().next().unwrap();
    assert_ne!(clone.id(), card_x);
    assert_eq!(clone.title(), "CardX");
    assert_eq!(clone.position(), 0);
    assert_eq!(
        outcome,
        MoveOutcome::Transferred {
            retired: card_x,
            created: clone.id(),
            position: 0,
        }
    );
}

#[test]
fn move_one_places_clone_at_requested_slot() {
    let mut source = table(&["Card1", "Card2", "Card3"]);
    let mut dest = table(&["Card4", "Card5"]);
    let card2 = source.ids()[1];

    move_one(&mut source, &mut dest, card2, 1).unwrap();

    assert_eq!(titles(&source), vec!["Card1", "Card3"]);
    assert_eq!(titles(&dest), vec!["Card4", "Card2", "Card5"]);
    assert!(source.is_consistent());
    assert!(dest.is_consistent());
}

#[test]
fn move_one_clones_checklist_and_keeps_tags() {
    let mut card = Card::new("Release").unwrap();
    let tag = Uuid::new_v4();
    card.tag_ids.insert(tag);
    card.checklist_mut()
        .append(ChecklistItem::new("changelog").unwrap())
        .unwrap();
    let original_item = card.checklist().ids()[0];
    let card_id = card.id();

    let mut source = PositionedCollection::new(Uuid::new_v4());
    source.append(card).unwrap();
    let mut dest = PositionedCollection::new(Uuid::new_v4());

    move_one(&mut source, &mut dest, card_id, 0).unwrap();

    let clone = dest.iter().next().unwrap();
    assert!(clone.tag_ids.contains(&tag));
    assert_eq!(clone.checklist().owner(), clone.id());
    assert_eq!(clone.checklist().len(), 1);
    assert_ne!(clone.checklist().ids()[0], original_item);
    assert_eq!(
        clone.checklist().iter().next().unwrap().text(),
        "changelog"
    );
}

#[test]
fn move_one_rejects_slot_past_end_without_touching_either_side() {
    let mut source = table(&["Card1"]);
    let mut dest = table(&["Card2"]);
    let card1 = source.ids()[0];
    let (source_before, dest_before) = (source.clone(), dest.clone());

    let err = move_one(&mut source, &mut dest, card1, 2).unwrap_err();

    assert_eq!(
        err,
        MoveError::Position(PositionError::InvalidPosition {
            owner: dest.owner(),
            requested: 2,
            len: 2,
        })
    );
    assert_eq!(source, source_before);
    assert_eq!(dest, dest_before);
}

#[test]
fn move_one_of_stranger_is_not_a_member_of_source() {
    let mut source = table(&["Card1"]);
    let mut dest = table(&[]);
    let stranger = Uuid::new_v4();

    let err = move_one(&mut source, &mut dest, stranger, 0).unwrap_err();

    assert_eq!(
        err,
        MoveError::Position(PositionError::NotAMember {
            owner: source.owner(),
            item: stranger,
        })
    );
}

#[test]
fn move_one_within_same_owner_is_noop_only_for_current_slot() {
    let mut first_handle = table(&["Card1", "Card2"]);
    let mut second_handle = first_handle.clone();
    let card1 = first_handle.ids()[0];

    let outcome = move_one(&mut first_handle, &mut second_handle, card1, 0).unwrap();
    assert_eq!(outcome, MoveOutcome::Unchanged);
    assert_eq!(first_handle, second_handle);

    let err = move_one(&mut first_handle, &mut second_handle, card1, 1).unwrap_err();
    assert_eq!(err, MoveError::SameOwner(first_handle.owner()));
}

#[test]
fn move_all_appends_in_order_and_keeps_identities() {
    let mut table_a = table(&["Card1", "Card2"]);
    let mut table_b = table(&["Card3"]);
    let moved_ids = table_a.ids().to_vec();

    let moved = move_all(&mut table_a, &mut table_b).unwrap();

    assert_eq!(moved, 2);
    assert!(table_a.is_empty());
    assert_eq!(titles(&table_b), vec!["Card3", "Card1", "Card2"]);
    assert_eq!(&table_b.ids()[1..], moved_ids.as_slice());
    assert!(table_b.is_consistent());
}

#[test]
fn move_all_between_handles_on_same_owner_moves_nothing() {
    let mut first_handle = table(&["Card1"]);
    let mut second_handle = first_handle.clone();

    assert_eq!(move_all(&mut first_handle, &mut second_handle).unwrap(), 0);
    assert_eq!(first_handle.len(), 1);
    assert_eq!(second_handle.len(), 1);
}

#[test]
fn move_all_rejects_identity_already_in_destination() {
    let mut source = table(&["Card1", "Card2"]);
    let shared = source.get(source.ids()[1]).unwrap().clone();
    let mut dest = PositionedCollection::new(Uuid::new_v4());
    dest.append(shared.clone()).unwrap();
    let source_before = source.clone();

    let err = move_all(&mut source, &mut dest).unwrap_err();

    assert_eq!(
        err,
        MoveError::Position(PositionError::DuplicateMember {
            owner: dest.owner(),
            item: shared.id(),
        })
    );
    assert_eq!(source, source_before);
    assert_eq!(dest.len(), 1);
}

#[test]
fn copy_all_leaves_source_and_appends_fresh_copies() {
    let source = table(&["Card1", "Card2"]);
    let mut dest = table(&["Card3"]);
    let source_before = source.clone();

    let created = copy_all(&source, &mut dest).unwrap();

    assert_eq!(source, source_before);
    assert_eq!(titles(&dest), vec!["Card3", "Card1", "Card2"]);
    assert_eq!(&dest.ids()[1..], created.as_slice());
    for id in &created {
        assert!(!source.contains(*id));
    }
}

#[test]
fn copy_all_onto_same_owner_is_rejected() {
    let source = table(&["Card1"]);
    let mut same = source.clone();

    let err = copy_all(&source, &mut same).unwrap_err();

    assert_eq!(err, MoveError::SameOwner(source.owner()));
    assert_eq!(same.len(), 1);
}

proptest! {
    #[test]
    fn move_all_conserves_items(source_len in 0usize..12, dest_len in 0usize..12) {
        let source_titles: Vec<String> = (0..source_len).map(|i| format!("s{i}")).collect();
        let dest_titles: Vec<String> = (0..dest_len).map(|i| format!("d{i}")).collect();
        let mut source = table(&source_titles.iter().map(String::as_str).collect::<Vec<_>>());
        let mut dest = table(&dest_titles.iter().map(String::as_str).collect::<Vec<_>>());
        let source_ids = source.ids().to_vec();

        move_all(&mut source, &mut dest).unwrap();

        prop_assert!(source.is_empty());
        prop_assert_eq!(dest.len(), source_len + dest_len);
        prop_assert_eq!(&dest.ids()[dest_len..], source_ids.as_slice());
        prop_assert!(dest.is_consistent());
    }

    #[test]
    fn copy_all_conserves_source(source_len in 0usize..12, dest_len in 0usize..12) {
        let source_titles: Vec<String> = (0..source_len).map(|i| format!("s{i}")).collect();
        let dest_titles: Vec<String> = (0..dest_len).map(|i| format!("d{i}")).collect();
        let source = table(&source_titles.iter().map(String::as_str).collect::<Vec<_>>());
        let mut dest = table(&dest_titles.iter().map(String::as_str).collect::<Vec<_>>());

        let created = copy_all(&source, &mut dest).unwrap();

        prop_assert_eq!(source.len(), source_len);
        prop_assert_eq!(dest.len(), dest_len + source_len);
        for id in created {
            prop_assert!(!source.contains(id));
        }
        prop_assert!(dest.is_consistent());
    }
}
