//! Item routing example: one ore chest feeding two furnaces.
//!
//! Loads the `smelting` network config from `data/pipes.ron`, wires an
//! interface between an ore chest and two furnaces, and runs forty ticks.
//! A boost is granted halfway through.
//!
//! Run with: `RUST_LOG=debug cargo run -p conduit-examples --example item_routing`

use conduit_core::dirty::DirtyTracker;
use conduit_core::endpoint::Access;
use conduit_core::event::{EventKind, RoutingEvent};
use conduit_core::id::{Direction, ItemTypeId, Position};
use conduit_core::network::PipeNetwork;
use conduit_core::topology::{LinkFaces, LinkMode, StaticTopology, TargetCandidate};
use conduit_core::world::ContainerWorld;
use conduit_data::load_pipe_config;
use std::path::Path;

const IRON_ORE: ItemTypeId = ItemTypeId(0);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let data_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
    let configs = match load_pipe_config(&data_dir) {
        Ok(configs) => configs,
        Err(e) => {
            log::error!("failed to load pipe config: {e}");
            std::process::exit(1);
        }
    };
    let config = *configs.for_network("smelting");
    log::info!("smelting config: {config:?}");

    // --- Layout: chest west of the interface, furnaces east of it ---

    let interface = Position::new(0, 64, 0);
    let chest = interface.offset(Direction::West);
    let furnace_a = Position::new(3, 64, 0);
    let furnace_b = Position::new(6, 64, 0);

    let mut world = ContainerWorld::new();
    let mut topology = StaticTopology::new();
    world.place(chest, 256, Access::EXTRACT_ONLY);
    let _ = world.fill(chest, IRON_ORE, 200);
    topology.set_link(
        interface,
        LinkFaces::new().with(Direction::West, LinkMode::Extract),
    );
    topology.add_source(interface, chest);

    // Furnaces take ore through their top face.
    for (furnace, capacity) in [(furnace_b, 60), (furnace_a, 30)] {
        world.place(furnace, capacity, Access::INSERT_ONLY);
        topology.add_target(interface, TargetCandidate::new(furnace, Direction::Up));
    }

    let mut network = match PipeNetwork::new(config) {
        Ok(network) => network,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = network.add_interface(interface) {
        log::error!("{e}");
        std::process::exit(1);
    }
    network.events_mut().on_passive(
        EventKind::TransferCommitted,
        Box::new(|event: &RoutingEvent| {
            if let RoutingEvent::TransferCommitted {
                quantity,
                targets,
                boosted,
                tick,
                ..
            } = event
            {
                log::info!(
                    "tick {tick:>2}: moved {quantity} ore into {targets} furnace(s){}",
                    if *boosted { " [boosted]" } else { "" }
                );
            }
        }),
    );

    // --- Run ---

    let mut dirty = DirtyTracker::new();
    for _ in 0..40 {
        if network.tick() == 21 {
            log::info!("granting boost");
            if let Err(e) = network.grant_boost(interface) {
                log::error!("{e}");
            }
        }
        network.step(&topology, &world, &mut dirty);
    }

    log::info!(
        "chest {} | furnace A {} | furnace B {} | {} commits",
        world.quantity(chest, IRON_ORE),
        world.quantity(furnace_a, IRON_ORE),
        world.quantity(furnace_b, IRON_ORE),
        dirty.mark_count()
    );
}
