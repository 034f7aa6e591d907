use crate::endpoint::{CapabilityProvider, EndpointHandle, EndpointResolver};
use crate::id::{Direction, Position};
use std::collections::HashMap;
use std::rc::Rc;

/// Memoizes per-position endpoint resolvers for one interface node.
///
/// Only the resolver is cached. Each lookup asks it afresh for the requested
/// face, so a container that vanished is seen as absent immediately. The
/// cache lives exactly as long as its owning node.
#[derive(Default)]
pub struct EndpointCache {
    resolvers: HashMap<Position, Rc<dyn EndpointResolver>>,
}

impl std::fmt::Debug for EndpointCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointCache")
            .field("positions", &self.resolvers.len())
            .finish()
    }
}

impl EndpointCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The memoized resolver for `pos`, created on first use.
    pub fn resolver(
        &mut self,
        capabilities: &dyn CapabilityProvider,
        pos: Position,
    ) -> Rc<dyn EndpointResolver> {
        Rc::clone(
            self.resolvers
                .entry(pos)
                .or_insert_with(|| capabilities.resolver(pos)),
        )
    }

    pub fn lookup(
        &mut self,
        capabilities: &dyn CapabilityProvider,
        pos: Position,
        direction: Direction,
    ) -> Option<EndpointHandle> {
        self.resolver(capabilities, pos).find(direction)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.resolvers.contains_key(&pos)
    }

    /// Number of positions with a memoized resolver.
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}
