//! Cross-crate routing tests: data file -> network -> ticks -> inventories.

use conduit_core::dirty::DirtyTracker;
use conduit_core::endpoint::Access;
use conduit_core::id::*;
use conduit_core::network::PipeNetwork;
use conduit_core::test_utils::*;
use conduit_core::topology::{StaticTopology, TargetCandidate};
use conduit_core::transfer::TickOutcome;
use conduit_core::world::ContainerWorld;
use conduit_data::{PipeConfigSet, load_pipe_config};
use std::fs;
use std::path::{Path, PathBuf};

fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "conduit_integration_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

fn load(suffix: &str, toml: &str) -> PipeConfigSet {
    let dir = make_test_dir(suffix);
    fs::write(dir.join("pipes.toml"), toml).unwrap();
    let set = load_pipe_config(&dir).unwrap();
    cleanup(&dir);
    set
}

// ===========================================================================
// Data-driven networks
// ===========================================================================

#[test]
fn loaded_override_drives_the_reference_scenario() {
    let set = load(
        "scenario",
        r#"
        [default]
        transfer_amount = 4

        [networks.reference]
        transfer_amount = 16
        period = 1
        "#,
    );

    let mut s = routing_scenario();
    s.network = PipeNetwork::new(*set.require("reference").unwrap()).unwrap();
    s.network.add_interface(NODE).unwrap();

    s.step();
    assert_eq!(s.quantity(SOURCE), 24);
    assert_eq!(s.quantity(NEAR), 16);
    assert_eq!(s.quantity(FAR), 0);

    s.step();
    s.step();
    // 40 units over three ticks: near fills to 30, far takes the rest.
    assert_eq!(s.quantity(SOURCE), 0);
    assert_eq!(s.quantity(NEAR), 30);
    assert_eq!(s.quantity(FAR), 10);
    assert_eq!(s.dirty.mark_count(), 3);
}

#[test]
fn separate_networks_share_one_world() {
    let set = load(
        "two_networks",
        r#"
        [networks.fast]
        transfer_amount = 10
        period = 1

        [networks.slow]
        transfer_amount = 10
        period = 5
        "#,
    );

    let mut world = ContainerWorld::new();
    let mut topology = StaticTopology::new();
    let fast_node = Position::new(0, 0, 0);
    let slow_node = Position::new(0, 10, 0);
    for node in [fast_node, slow_node] {
        let source = node.offset(Direction::West);
        world.place(source, 100, Access::BOTH);
        let _ = world.fill(source, iron_ore(), 100);
        wire_source(&mut topology, node, source);
        place_target(&mut world, &mut topology, node, Position::new(2, node.y, 0), 100);
    }

    let mut fast = PipeNetwork::new(*set.require("fast").unwrap()).unwrap();
    let mut slow = PipeNetwork::new(*set.require("slow").unwrap()).unwrap();
    fast.add_interface(fast_node).unwrap();
    slow.add_interface(slow_node).unwrap();

    let mut dirty = DirtyTracker::new();
    for _ in 0..6 {
        fast.step(&topology, &world, &mut dirty);
        slow.step(&topology, &world, &mut dirty);
    }
    assert_eq!(world.quantity(Position::new(2, 0, 0), iron_ore()), 60);
    assert_eq!(world.quantity(Position::new(2, 10, 0), iron_ore()), 20);
    assert!(dirty.is_node_dirty(fast_node));
    assert!(dirty.is_node_dirty(slow_node));
}

// ===========================================================================
// Chained interfaces
// ===========================================================================

const A: Position = Position::new(0, 0, 0);
const MIDDLE: Position = Position::new(3, 0, 0);
const B: Position = Position::new(4, 0, 0);
const END: Position = Position::new(7, 0, 0);

/// A pulls from its west chest into MIDDLE; B pulls from MIDDLE into END.
fn chain(middle_face: Direction) -> Scenario {
    let mut world = ContainerWorld::new();
    let mut topology = StaticTopology::new();

    let start = A.offset(Direction::West);
    world.place(start, 100, Access::BOTH);
    let _ = world.fill(start, coal(), 50);
    wire_source(&mut topology, A, start);

    world.place(MIDDLE, 100, Access::BOTH);
    topology.add_target(A, TargetCandidate::new(MIDDLE, middle_face));

    wire_source(&mut topology, B, MIDDLE);
    place_target(&mut world, &mut topology, B, END, 100);

    let mut network = PipeNetwork::new(config(8, 1)).unwrap();
    network.add_interface(B).unwrap();
    network.add_interface(A).unwrap();
    Scenario {
        topology,
        world,
        network,
        dirty: DirtyTracker::new(),
    }
}

#[test]
fn target_reached_through_an_extracting_link_is_excluded() {
    // MIDDLE's east face leads straight into B, which pulls from it.
    let mut s = chain(Direction::East);
    let report = s.step();
    assert_eq!(report.outcome(A), Some(TickOutcome::NoTargets));
    assert_eq!(s.world.total(MIDDLE), 0);
}

#[test]
fn chained_interfaces_relay_within_one_step() {
    let mut s = chain(Direction::Up);
    let report = s.step();

    // A ticks first (lower position), so B already sees what A delivered.
    let order: Vec<Position> = report.outcomes.iter().map(|(p, _)| *p).collect();
    assert_eq!(order, vec![A, B]);
    assert_eq!(s.world.quantity(END, coal()), 8);
    assert_eq!(s.world.total(MIDDLE), 0);

    for _ in 0..10 {
        s.step();
    }
    assert_eq!(s.world.quantity(END, coal()), 50);
    assert_eq!(s.world.total(A.offset(Direction::West)), 0);
}

#[test]
fn removing_an_interface_stops_its_traffic() {
    let mut s = chain(Direction::Up);
    s.step();
    let removed = s.network.remove_interface(B).unwrap();
    assert!(removed.fingerprint().is_some());

    s.step();
    assert_eq!(s.world.quantity(END, coal()), 8);
    assert_eq!(s.world.total(MIDDLE), 8);
}
