#![forbid(unsafe_code)]

use std::collections::HashSet;

use mesh_dock::{DockModel, DropZone, MoveOutcome, PanelId, StaticRoomDirectory};
use mesh_domain::{RoomId, TabId};
use proptest::prelude::*;

const ROOMS: [&str; 6] = ["room1", "room2", "room3", "dm1", "dm2", "space1"];

#[derive(Debug, Clone)]
enum Op {
	Open(usize),
	Close(usize),
	Activate(usize),
	Move { tab: usize, leaf: usize, zone: DropZone },
}

fn op() -> impl Strategy<Value = Op> {
	prop_oneof![
		(0..ROOMS.len()).prop_map(Op::Open),
		any::<usize>().prop_map(Op::Close),
		any::<usize>().prop_map(Op::Activate),
		(any::<usize>(), any::<usize>(), prop::sample::select(DropZone::ALL.to_vec()))
			.prop_map(|(tab, leaf, zone)| Op::Move { tab, leaf, zone }),
	]
}

fn directory() -> StaticRoomDirectory {
	ROOMS
		.iter()
		.map(|r| (RoomId::new(*r).unwrap(), format!("{r}-name")))
		.collect()
}

fn all_tabs(model: &DockModel) -> Vec<(PanelId, TabId)> {
	model
		.leaves()
		.into_iter()
		.flat_map(|leaf| {
			model
				.tree()
				.leaf(leaf)
				.map(|l| l.tabs.iter().map(|t| (leaf, t.id)).collect::<Vec<_>>())
				.unwrap_or_default()
		})
		.collect()
}

fn apply(model: &mut DockModel, dir: &StaticRoomDirectory, op: &Op) {
	let tabs = all_tabs(model);
	let leaves = model.leaves();
	match *op {
		Op::Open(i) => {
			model.open_room(RoomId::new(ROOMS[i]).unwrap(), dir);
		}
		Op::Close(i) if !tabs.is_empty() => {
			let (leaf, tab) = tabs[i % tabs.len()];
			model.close_tab(leaf, tab);
		}
		Op::Activate(i) if !tabs.is_empty() => {
			let (leaf, tab) = tabs[i % tabs.len()];
			model.activate_tab(leaf, tab);
		}
		Op::Move { tab, leaf, zone } if !tabs.is_empty() => {
			let (_, tab) = tabs[tab % tabs.len()];
			let leaf = leaves[leaf % leaves.len()];
			model.move_tab(tab, leaf, zone).unwrap();
		}
		_ => {}
	}
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(256))]

	#[test]
	fn random_operations_keep_the_tree_valid(ops in prop::collection::vec(op(), 1..60)) {
		let dir = directory();
		let mut model = DockModel::new();
		let default_leaf = model.default_leaf();

		for op in &ops {
			apply(&mut model, &dir, op);

			prop_assert!(model.tree().check_invariants().is_ok(), "{:?}", model.tree().check_invariants());
			prop_assert_eq!(model.default_leaf(), default_leaf);
			prop_assert!(model.tree().leaf(default_leaf).is_some());

			let tabs = all_tabs(&model);
			let rooms: HashSet<RoomId> = tabs
				.iter()
				.filter_map(|(_, t)| model.find_tab(*t).map(|(_, info)| info.room_id.clone()))
				.collect();
			prop_assert_eq!(rooms.len(), tabs.len());
			prop_assert_eq!(model.tab_count(), tabs.len());
		}
	}

	#[test]
	fn split_then_merge_restores_membership(extra in 1usize..4, zone in prop::sample::select(vec![
		DropZone::Left,
		DropZone::Right,
		DropZone::Top,
		DropZone::Bottom,
	])) {
		let dir = directory();
		let mut model = DockModel::new();
		let home = model.default_leaf();
		let mut opened = Vec::new();
		for room in ROOMS.iter().take(extra + 1) {
			opened.push(model.open_room(RoomId::new(*room).unwrap(), &dir));
		}
		let moved = *opened.last().unwrap();

		let outcome = model.move_tab(moved, home, zone).unwrap();
		let is_split = matches!(outcome, MoveOutcome::Split { .. });
		prop_assert!(is_split);
		prop_assert_eq!(model.leaves().len(), 2);

		model.move_tab(moved, home, DropZone::Center).unwrap();
		prop_assert_eq!(model.leaves(), vec![home]);
		prop_assert_eq!(model.tree().root(), home);
		let tabs: HashSet<TabId> = model.tree().leaf(home).unwrap().tabs.iter().map(|t| t.id).collect();
		prop_assert_eq!(tabs, opened.into_iter().collect::<HashSet<_>>());
	}
}
