//! Per-world routing state: the interface nodes, their boost charges and
//! the global tick counter.

use crate::config::{ConfigError, PipeConfig};
use crate::dirty::DirtySink;
use crate::endpoint::CapabilityProvider;
use crate::event::EventBus;
use crate::id::{Position, Ticks};
use crate::node::{InterfaceNode, TickContext};
use crate::rate::{BoostCharge, BoostSource, RateController};
use crate::topology::TopologyView;
use crate::transfer::TickOutcome;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("an interface already exists at {0}")]
    DuplicateInterface(Position),
    #[error("no interface at {0}")]
    UnknownInterface(Position),
    #[error("invalid pipe config: {0}")]
    Config(#[from] ConfigError),
}

/// Outcome of every node for one [`PipeNetwork::step`], in tick order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub tick: Ticks,
    pub outcomes: Vec<(Position, TickOutcome)>,
}

impl StepReport {
    pub fn outcome(&self, pos: Position) -> Option<TickOutcome> {
        self.outcomes
            .iter()
            .find(|(p, _)| *p == pos)
            .map(|(_, outcome)| *outcome)
    }

    pub fn committed(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_committed()).count()
    }

    /// Units moved across all nodes this step.
    pub fn moved(&self) -> u64 {
        self.outcomes.iter().map(|(_, o)| u64::from(o.moved())).sum()
    }
}

#[derive(Debug)]
struct Interface {
    node: InterfaceNode,
    boost: BoostCharge,
}

/// All routing state of one simulated world.
///
/// The topology, the containers and the dirty sink are owned elsewhere and
/// passed to [`step`](PipeNetwork::step).
#[derive(Debug)]
pub struct PipeNetwork {
    config: PipeConfig,
    rate: RateController,
    interfaces: BTreeMap<Position, Interface>,
    tick: Ticks,
    events: EventBus,
}

impl PipeNetwork {
    pub fn new(config: PipeConfig) -> Result<Self, NetworkError> {
        config.validate()?;
        Ok(Self {
            rate: RateController::new(&config),
            config,
            interfaces: BTreeMap::new(),
            tick: 0,
            events: EventBus::default(),
        })
    }

    pub fn config(&self) -> &PipeConfig {
        &self.config
    }

    /// The tick the next [`step`](PipeNetwork::step) will evaluate.
    pub fn tick(&self) -> Ticks {
        self.tick
    }

    pub fn add_interface(&mut self, pos: Position) -> Result<(), NetworkError> {
        if self.interfaces.contains_key(&pos) {
            return Err(NetworkError::DuplicateInterface(pos));
        }
        self.interfaces.insert(
            pos,
            Interface {
                node: InterfaceNode::new(pos),
                boost: BoostCharge::new(),
            },
        );
        Ok(())
    }

    /// Remove an interface. Its endpoint cache and target memo go with it.
    pub fn remove_interface(&mut self, pos: Position) -> Result<InterfaceNode, NetworkError> {
        self.interfaces
            .remove(&pos)
            .map(|i| i.node)
            .ok_or(NetworkError::UnknownInterface(pos))
    }

    /// The external boost event: the interface at `pos` runs on the next
    /// step at boosted capacity.
    pub fn grant_boost(&mut self, pos: Position) -> Result<(), NetworkError> {
        let interface = self
            .interfaces
            .get_mut(&pos)
            .ok_or(NetworkError::UnknownInterface(pos))?;
        interface.boost.grant();
        Ok(())
    }

    pub fn has_boost(&self, pos: Position) -> bool {
        self.interfaces
            .get(&pos)
            .is_some_and(|i| i.boost.is_boost_available())
    }

    pub fn interface(&self, pos: Position) -> Option<&InterfaceNode> {
        self.interfaces.get(&pos).map(|i| &i.node)
    }

    /// Interfaces in tick order.
    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceNode> + '_ {
        self.interfaces.values().map(|i| &i.node)
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// For registering listeners and suppressing kinds.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Evaluate every interface once for the current tick, in ascending
    /// position order, then deliver events and advance the tick counter.
    pub fn step(
        &mut self,
        topology: &dyn TopologyView,
        capabilities: &dyn CapabilityProvider,
        dirty: &mut dyn DirtySink,
    ) -> StepReport {
        let tick = self.tick;
        let mut outcomes = Vec::with_capacity(self.interfaces.len());
        {
            let mut ctx = TickContext {
                tick,
                topology,
                capabilities,
                dirty,
                events: &mut self.events,
                rate: &self.rate,
                max_stack_size: self.config.max_stack_size,
            };
            for (pos, interface) in self.interfaces.iter_mut() {
                let outcome = interface.node.tick(&mut ctx, &mut interface.boost);
                outcomes.push((*pos, outcome));
            }
        }
        self.events.deliver();
        self.tick += 1;
        StepReport { tick, outcomes }
    }
}
