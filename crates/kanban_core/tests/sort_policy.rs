use kanban_core::{ChecklistItem, Positioned, PositionedCollection, SortPolicy};
use proptest::prelude::*;
use uuid::Uuid;

fn checklist(texts: &[&str]) -> PositionedCollection<ChecklistItem> {
    PositionedCollection::from_ordered(
        Uuid::new_v4(),
        texts.iter().map(|text| ChecklistItem::new(text).unwrap()),
    )
    .unwrap()
}

fn texts(collection: &PositionedCollection<ChecklistItem>) -> Vec<&str> {
    collection.iter().map(ChecklistItem::text).collect()
}

#[test]
fn label_sort_is_ordinal_not_locale_aware() {
    let mut items = checklist(&["beta", "Alpha", "alpha", "Beta"]);

    SortPolicy::LabelAscending.apply(&mut items);
    assert_eq!(texts(&items), vec!["Alpha", "Beta", "alpha", "beta"]);

    SortPolicy::LabelDescending.apply(&mut items);
    assert_eq!(texts(&items), vec!["beta", "alpha", "Beta", "Alpha"]);
    assert!(items.is_consistent());
}

#[test]
fn label_ties_fall_back_to_identity_ascending() {
    let mut items = checklist(&["same", "same", "same"]);
    let mut expected = items.ids().to_vec();
    expected.sort();

    SortPolicy::LabelDescending.apply(&mut items);

    assert_eq!(items.ids(), expected.as_slice());
}

#[test]
fn identity_sorts_are_mirror_images() {
    let mut items = checklist(&["c", "a", "b", "d"]);
    let mut ascending = items.ids().to_vec();
    ascending.sort();

    SortPolicy::IdAscending.apply(&mut items);
    assert_eq!(items.ids(), ascending.as_slice());

    SortPolicy::IdDescending.apply(&mut items);
    ascending.reverse();
    assert_eq!(items.ids(), ascending.as_slice());
    assert!(items.iter().enumerate().all(|(index, item)| item.position() == index));
}

#[test]
fn sorting_empty_collection_stays_empty() {
    let mut items = checklist(&[]);

    for policy in SortPolicy::ALL {
        policy.apply(&mut items);
        assert!(items.is_empty());
    }
}

proptest! {
    #[test]
    fn applying_a_policy_twice_gives_the_same_order(
        labels in prop::collection::vec("[a-cA-C]{0,3}", 0..16),
        policy_index in 0usize..4,
    ) {
        let policy = SortPolicy::ALL[policy_index];
        let mut items = PositionedCollection::from_ordered(
            Uuid::new_v4(),
            labels
                .iter()
                .map(|label| ChecklistItem::new(&format!("item {label}")).unwrap()),
        )
        .unwrap();

        policy.apply(&mut items);
        let first = items.clone();
        policy.apply(&mut items);

        prop_assert_eq!(items, first);
    }
}
