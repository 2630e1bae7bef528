//! Drives a simulation on a free-running clock.

use super::*;

use std::io::Write;
use log::*;

/// What the harness needs from a simulation engine.
///
/// The harness owns the instance and spool only long enough to hand both to
/// [`Engine::bind_debug_endpoint`]; from then on it talks to the endpoint.
pub trait Engine {
    type Instance;
    type Spool;
    type Endpoint;

    fn open_spool(&mut self, path: &std::path::Path) -> Result<Self::Spool, AgentError>;
    fn create_instance(&mut self) -> Self::Instance;

    /// Returns the endpoint and the URI debuggers can reach it at.
    fn bind_debug_endpoint(
        &mut self,
        instance: Self::Instance,
        spool: Self::Spool,
        transport: &Transport,
    ) -> Result<(Self::Endpoint, String), AgentError>;

    fn advance_time(&mut self, endpoint: &mut Self::Endpoint, quantum: TimeDelta);
    fn set_signal(&mut self, endpoint: &mut Self::Endpoint, name: &str, value: bool) -> Result<(), AgentError>;
    fn step(&mut self, endpoint: &mut Self::Endpoint) -> Result<(), AgentError>;
}

pub struct Harness<E: Engine> {
    engine: E,
    endpoint: E::Endpoint,
    clock: String,
    quantum: TimeDelta,
    cycles: u64,
}

impl<E: Engine> Harness<E> {
    /// Opens the spool, builds the design, serves it, and evaluates its power-on state.
    ///
    /// The status line goes to `diagnostics` once the endpoint is bound.
    pub fn start<W: Write>(mut engine: E, config: &Config, diagnostics: &mut W) -> Result<Harness<E>, AgentError> {
        let spool = engine.open_spool(&config.spool_path)?;
        let instance = engine.create_instance();
        let (mut endpoint, uri) = engine.bind_debug_endpoint(instance, spool, &config.transport)?;

        if let Err(e) = writeln!(diagnostics, "Simulation started on {uri}") {
            warn!("Couldn't report the debug URI: {e}");
        }

        engine.step(&mut endpoint)?;

        Ok(Harness {
            engine,
            endpoint,
            clock: config.clock.clone(),
            quantum: config.quantum,
            cycles: 0,
        })
    }

    pub fn endpoint(&self) -> &E::Endpoint {
        &self.endpoint
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn half_cycle(&mut self, level: bool) -> Result<(), AgentError> {
        self.engine.advance_time(&mut self.endpoint, self.quantum);
        self.engine.set_signal(&mut self.endpoint, &self.clock, level)?;
        self.engine.step(&mut self.endpoint)
    }

    /// One full clock period: a falling half followed by a rising half.
    pub fn cycle(&mut self) -> Result<(), AgentError> {
        self.half_cycle(false)?;
        self.half_cycle(true)?;
        self.cycles += 1;
        Ok(())
    }

    pub fn run_cycles(&mut self, cycles: u64) -> Result<(), AgentError> {
        for _ in 0..cycles {
            self.cycle()?;
        }
        Ok(())
    }

    /// Clocks the design until the engine fails.
    pub fn run(&mut self) -> Result<std::convert::Infallible, AgentError> {
        info!("Running {} with a half period of {}", self.clock, self.quantum);
        loop {
            self.cycle()?;
        }
    }
}

#[cfg(test)]
mod tests;
