//! The simulation side of the debug bridge.

use super::*;
use crate::harness::Engine;
use crate::server::{self, Bridge};
use crate::sim::{Circuit, Sim};
use crate::spool::{Recorder, Spool};

use std::net::SocketAddr;
use std::sync::Arc;
use log::*;

/// A design instance bound to a spool and served to debuggers.
///
/// Every [`Agent::step`] evaluates the design, appends the result to the spool and then makes it
/// visible to clients. Steps after the first wait while a client has the simulation paused.
pub struct Agent {
    sim: Sim,
    recorder: Recorder,
    bridge: Arc<Bridge>,
    local_addr: SocketAddr,
    time: TimePoint,
    steps: u64,
}

impl Agent {
    pub fn bind(sim: Sim, spool: Spool, transport: &Transport, start_paused: bool) -> Result<Agent, AgentError> {
        let inventory = Inventory::new(sim.circuit());
        let spool_path = spool.path().to_path_buf();
        let recorder = Recorder::new(spool, &inventory)?;
        let bridge = Arc::new(Bridge::new(inventory, spool_path, start_paused));
        let local_addr = server::listen(transport.address(), bridge.clone())?;

        Ok(Agent {
            sim,
            recorder,
            bridge,
            local_addr,
            time: TimePoint::ZERO,
            steps: 0,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn sim(&self) -> &Sim {
        &self.sim
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// The time the next step is evaluated at.
    pub fn time(&self) -> TimePoint {
        self.time
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn advance(&mut self, delta: TimeDelta) {
        self.time += delta;
    }

    pub fn set(&mut self, name: &str, value: bool) -> Result<(), AgentError> {
        self.sim.poke(name, value.into())?;
        Ok(())
    }

    pub fn step(&mut self) -> Result<(), AgentError> {
        if self.steps > 0 {
            self.bridge.hold(self.time);
        }
        let latched = self.sim.eval();
        let recorded = self.recorder.record(self.time, self.sim.values())?;
        self.bridge.publish(self.time, recorded);
        self.steps += 1;
        trace!("Step {} at {}: {latched} registers latched", self.steps, self.time);
        Ok(())
    }
}

/// Runs a built-in design behind an [`Agent`].
pub struct AgentEngine {
    design: fn() -> Circuit,
    start_paused: bool,
}

impl AgentEngine {
    pub fn new(design: fn() -> Circuit, start_paused: bool) -> AgentEngine {
        AgentEngine { design, start_paused }
    }
}

impl Engine for AgentEngine {
    type Instance = Sim;
    type Spool = Spool;
    type Endpoint = Agent;

    fn open_spool(&mut self, path: &std::path::Path) -> Result<Spool, AgentError> {
        Spool::open(path)
    }

    fn create_instance(&mut self) -> Sim {
        let circuit = (self.design)();
        if let Err(errors) = circuit.check() {
            for error in errors {
                warn!("{error}");
            }
        }
        Sim::new(circuit)
    }

    fn bind_debug_endpoint(
        &mut self,
        instance: Sim,
        spool: Spool,
        transport: &Transport,
    ) -> Result<(Agent, String), AgentError> {
        let agent = Agent::bind(instance, spool, transport, self.start_paused)?;
        let uri = transport.uri(agent.local_addr());
        Ok((agent, uri))
    }

    fn advance_time(&mut self, endpoint: &mut Agent, quantum: TimeDelta) {
        endpoint.advance(quantum);
    }

    fn set_signal(&mut self, endpoint: &mut Agent, name: &str, value: bool) -> Result<(), AgentError> {
        endpoint.set(name, value)
    }

    fn step(&mut self, endpoint: &mut Agent) -> Result<(), AgentError> {
        endpoint.step()
    }
}
