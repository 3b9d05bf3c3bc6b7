use proptest::prelude::*;
use sb_core::{ParentKey, ScriptKey};
use sb_forest::{Forest, InsertSource, MoveDirection, RemoveMode};
use sb_view::{MemoryDisplay, NodeState, ViewSynchronizer};

#[derive(Clone, Debug)]
enum Step {
    Insert { parent: usize, index: usize },
    Remove { target: usize, promote: bool },
    Move { target: usize, direction: MoveDirection },
    Expand { target: usize },
    Collapse { target: usize },
    Rename { target: usize, name: String },
}

fn arb_direction() -> impl Strategy<Value = MoveDirection> {
    prop_oneof![
        Just(MoveDirection::Up),
        Just(MoveDirection::Down),
        Just(MoveDirection::In),
        Just(MoveDirection::Out),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (any::<usize>(), any::<usize>())
            .prop_map(|(parent, index)| Step::Insert { parent, index }),
        1 => (any::<usize>(), any::<bool>())
            .prop_map(|(target, promote)| Step::Remove { target, promote }),
        4 => (any::<usize>(), arb_direction())
            .prop_map(|(target, direction)| Step::Move { target, direction }),
        2 => any::<usize>().prop_map(|target| Step::Expand { target }),
        1 => any::<usize>().prop_map(|target| Step::Collapse { target }),
        1 => (any::<usize>(), "[A-Za-z]{0,5}")
            .prop_map(|(target, name)| Step::Rename { target, name }),
    ]
}

fn pick(forest: &Forest, choice: usize) -> Option<ScriptKey> {
    let keys = forest.walk();
    if keys.is_empty() {
        return None;
    }
    Some(keys[choice % keys.len()].1)
}

fn apply(forest: &mut Forest, view: &mut ViewSynchronizer<MemoryDisplay>, step: &Step) {
    match step {
        Step::Insert { parent, index } => {
            let parent = match pick(forest, *parent) {
                Some(key) if parent % 3 != 0 => ParentKey::Entry(key),
                _ => ParentKey::Root,
            };
            let name = format!("S{}", forest.len());
            forest
                .insert(parent, index % 6, InsertSource::named(name, ""))
                .expect("insert under a live parent");
            view.restitch(forest, parent);
        }
        Step::Remove { target, promote } => {
            if let Some(key) = pick(forest, *target) {
                let (parent, _) = forest.parent_of(key).expect("placed");
                let mode = if *promote {
                    RemoveMode::PromoteChildren
                } else {
                    RemoveMode::DeleteSubtree
                };
                forest.remove(key, mode).expect("remove a live key");
                view.restitch(forest, parent);
            }
        }
        Step::Move { target, direction } => {
            if let Some(key) = pick(forest, *target) {
                if let Ok(from) = forest.move_script(key, *direction) {
                    view.restitch_move(forest, from, key);
                }
            }
        }
        Step::Expand { target } => {
            if let Some(key) = pick(forest, *target) {
                let _ = view.expand(forest, key);
            }
        }
        Step::Collapse { target } => {
            if let Some(key) = pick(forest, *target) {
                let _ = view.collapse(key);
            }
        }
        Step::Rename { target, name } => {
            if let Some(key) = pick(forest, *target) {
                forest.rename(key, name).expect("rename a live key");
                view.refresh_label(forest, key).expect("refresh");
            }
        }
    }
}

/// Outline the display should show, given the forest and each node's expansion state.
fn expected_outline(
    forest: &Forest,
    view: &ViewSynchronizer<MemoryDisplay>,
    parent: ParentKey,
    depth: usize,
    out: &mut String,
) {
    for key in forest.children(parent) {
        let indent = "  ".repeat(depth);
        let label = forest.lookup(*key).expect("live child").display_label();
        out.push_str(&format!("{}{}\n", indent, label));
        match view.state(*key) {
            Some(NodeState::Materialized) => {
                expected_outline(forest, view, ParentKey::Entry(*key), depth + 1, out)
            }
            Some(NodeState::Collapsed) if forest.has_children(*key) => {
                out.push_str(&format!("{}  ...\n", indent));
            }
            Some(NodeState::Leaf) if !forest.has_children(*key) => {}
            other => out.push_str(&format!("{}  <{} is {:?}>\n", indent, key, other)),
        }
    }
}

fn seeded_forest(seed: u32) -> Forest {
    let mut forest = Forest::with_seed(seed);
    let main = forest
        .insert(ParentKey::Root, 0, InsertSource::named("Main", ""))
        .expect("main");
    let sub = forest
        .insert(ParentKey::Root, 1, InsertSource::named("Sub", ""))
        .expect("sub");
    forest
        .insert(ParentKey::Entry(sub), 0, InsertSource::named("Child", ""))
        .expect("child");
    forest
        .insert(ParentKey::Entry(main), 0, InsertSource::named("Inner", ""))
        .expect("inner");
    forest
}

proptest! {
    #[test]
    fn display_tracks_the_forest_through_edits(
        seed in any::<u32>(),
        steps in prop::collection::vec(arb_step(), 0..40),
    ) {
        let mut forest = seeded_forest(seed);
        let mut view = ViewSynchronizer::new(MemoryDisplay::new());
        view.build_from_root(&forest);

        for step in &steps {
            apply(&mut forest, &mut view, step);
            let mut expected = String::new();
            expected_outline(&forest, &view, ParentKey::Root, 0, &mut expected);
            prop_assert_eq!(view.display().render(), expected, "after {:?}", step);
        }
    }
}
