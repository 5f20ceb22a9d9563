use annotator_schema::Annotation;
use annotator_store::{import_bytes, Position};
use annotator_test_utils::{
    create_annotated_experiment, create_test_experiment, memory_store, memory_store_with,
    system_role_bytes,
};
use proptest::prelude::*;

fn verdict() -> impl Strategy<Value = Option<Annotation>> {
    prop_oneof![
        Just(None),
        Just(Some(Annotation::Pass)),
        Just(Some(Annotation::Fail)),
    ]
}

#[derive(Debug, Clone)]
enum Step {
    Next,
    Previous,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![Just(Step::Next), Just(Step::Previous)]
}

#[test]
fn test_toggle_on_empty_store_is_noop() {
    let (mut store, _) = memory_store();
    assert!(!store.toggle_annotation(Annotation::Pass));
    assert_eq!(store.annotated_count(), 0);
}

proptest! {
    #[test]
    fn prop_toggle_twice_restores(start in verdict(), v in prop_oneof![Just(Annotation::Pass), Just(Annotation::Fail)]) {
        let (mut store, _) = memory_store_with(create_annotated_experiment(&[start]));
        store.toggle_annotation(v);
        store.toggle_annotation(v);
        prop_assert_eq!(store.current_entry().unwrap().annotation, start);
    }

    #[test]
    fn prop_pass_then_fail_is_fail(start in verdict()) {
        let (mut store, _) = memory_store_with(create_annotated_experiment(&[start]));
        store.toggle_annotation(Annotation::Pass);
        store.toggle_annotation(Annotation::Fail);
        prop_assert_eq!(store.current_entry().unwrap().annotation, Some(Annotation::Fail));
    }

    #[test]
    fn prop_annotated_count_matches_entries(verdicts in prop::collection::vec(verdict(), 0..12)) {
        let expected = verdicts.iter().filter(|v| v.is_some()).count();
        let (store, _) = memory_store_with(create_annotated_experiment(&verdicts));
        prop_assert_eq!(store.annotated_count(), expected);
        prop_assert_eq!(store.progress().total, verdicts.len());
    }

    #[test]
    fn prop_cursor_stays_in_bounds(len in 0usize..8, steps in prop::collection::vec(step(), 0..40)) {
        let (mut store, _) = memory_store_with(create_test_experiment(len));
        for s in steps {
            match s {
                Step::Next => { store.next(); }
                Step::Previous => { store.previous(); }
            }
            if len == 0 {
                prop_assert_eq!(store.current_index(), 0);
                prop_assert_eq!(store.cursor().position(), Position::Empty);
            } else {
                prop_assert!(store.current_index() < len);
                prop_assert!(store.current_entry().is_some());
            }
        }
    }

    #[test]
    fn prop_failed_import_is_atomic(
        verdicts in prop::collection::vec(verdict(), 1..6),
        moves in 0usize..6,
    ) {
        let (mut store, _) = memory_store_with(create_annotated_experiment(&verdicts));
        for _ in 0..moves {
            store.next();
        }
        let count = store.annotated_count();
        let index = store.current_index();
        let before = store.snapshot();

        prop_assert!(import_bytes(&mut store, &system_role_bytes()).is_err());
        prop_assert!(import_bytes(&mut store, b"[1, 2").is_err());

        prop_assert_eq!(store.annotated_count(), count);
        prop_assert_eq!(store.current_index(), index);
        prop_assert_eq!(store.snapshot(), before);
    }
}
