use super::*;

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    OpenSpool(PathBuf),
    CreateInstance,
    Bind,
    Advance(TimeDelta),
    Set(String, bool),
    Step(TimePoint),
}

struct MockInstance;

#[derive(Default)]
struct MockEngine {
    calls: Vec<Call>,
    spool_fails: bool,
    fail_at_step: Option<usize>,
}

#[derive(Default)]
struct MockEndpoint {
    calls: Vec<Call>,
    time: TimePoint,
    steps: usize,
}

impl MockEndpoint {
    fn clock_levels(&self) -> Vec<bool> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Set(_name, level) => Some(*level),
                _ => None,
            })
            .collect()
    }

    fn step_times(&self) -> Vec<TimePoint> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Step(time) => Some(*time),
                _ => None,
            })
            .collect()
    }
}

impl Engine for MockEngine {
    type Instance = MockInstance;
    type Spool = ();
    type Endpoint = MockEndpoint;

    fn open_spool(&mut self, path: &std::path::Path) -> Result<(), AgentError> {
        self.calls.push(Call::OpenSpool(path.to_path_buf()));
        if self.spool_fails {
            let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
            return Err(AgentError::Spool { path: path.to_path_buf(), source });
        }
        Ok(())
    }

    fn create_instance(&mut self) -> MockInstance {
        self.calls.push(Call::CreateInstance);
        MockInstance
    }

    fn bind_debug_endpoint(&mut self, _instance: MockInstance, _spool: (), _transport: &Transport) -> Result<(MockEndpoint, String), AgentError> {
        self.calls.push(Call::Bind);
        let endpoint = MockEndpoint {
            calls: std::mem::take(&mut self.calls),
            ..MockEndpoint::default()
        };
        Ok((endpoint, "mock://endpoint".to_string()))
    }

    fn advance_time(&mut self, endpoint: &mut MockEndpoint, quantum: TimeDelta) {
        endpoint.time += quantum;
        endpoint.calls.push(Call::Advance(quantum));
    }

    fn set_signal(&mut self, endpoint: &mut MockEndpoint, name: &str, value: bool) -> Result<(), AgentError> {
        endpoint.calls.push(Call::Set(name.to_string(), value));
        Ok(())
    }

    fn step(&mut self, endpoint: &mut MockEndpoint) -> Result<(), AgentError> {
        if self.fail_at_step == Some(endpoint.steps) {
            return Err(SimError::NoSuchNet(Path::from("top.clk")).into());
        }
        endpoint.steps += 1;
        endpoint.calls.push(Call::Step(endpoint.time));
        Ok(())
    }
}

#[test]
fn startup_order_and_status_line() {
    let config = Config::default();
    let mut diagnostics = vec![];
    let harness = Harness::start(MockEngine::default(), &config, &mut diagnostics).unwrap();

    assert_eq!(String::from_utf8(diagnostics).unwrap(), "Simulation started on mock://endpoint\n");
    assert_eq!(
        harness.endpoint().calls,
        vec![
            Call::OpenSpool(PathBuf::from("spool.bin")),
            Call::CreateInstance,
            Call::Bind,
            Call::Step(TimePoint::ZERO),
        ],
    );
}

#[test]
fn three_cycles() {
    let config = Config::default();
    let mut harness = Harness::start(MockEngine::default(), &config, &mut std::io::sink()).unwrap();
    harness.run_cycles(3).unwrap();
    assert_eq!(harness.cycles(), 3);

    let endpoint = harness.endpoint();
    assert_eq!(endpoint.clock_levels(), vec![false, true, false, true, false, true]);
    assert_eq!(endpoint.steps, 7);

    let times = endpoint.step_times();
    assert_eq!(times.len(), 7);
    assert_eq!(times[0], TimePoint::ZERO);
    assert_eq!(times[6], TimePoint::ZERO + TimeDelta::ns(6));
    assert!(times.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn every_half_cycle_advances_then_sets_then_steps() {
    let config = Config::default();
    let mut harness = Harness::start(MockEngine::default(), &config, &mut std::io::sink()).unwrap();
    harness.run_cycles(1).unwrap();

    let after_start = &harness.endpoint().calls[4..];
    assert_eq!(
        after_start,
        &[
            Call::Advance(TimeDelta::ns(1)),
            Call::Set("top.clk".to_string(), false),
            Call::Step(TimePoint::ZERO + TimeDelta::ns(1)),
            Call::Advance(TimeDelta::ns(1)),
            Call::Set("top.clk".to_string(), true),
            Call::Step(TimePoint::ZERO + TimeDelta::ns(2)),
        ],
    );
}

#[test]
fn spool_failure_reports_nothing() {
    let engine = MockEngine { spool_fails: true, ..MockEngine::default() };
    let mut diagnostics = vec![];
    let result = Harness::start(engine, &Config::default(), &mut diagnostics);
    assert!(matches!(result, Err(AgentError::Spool { .. })));
    assert!(diagnostics.is_empty());
}

#[test]
fn step_failure_stops_the_loop() {
    let engine = MockEngine { fail_at_step: Some(4), ..MockEngine::default() };
    let mut harness = Harness::start(engine, &Config::default(), &mut std::io::sink()).unwrap();
    let result = harness.run();
    assert!(matches!(result, Err(AgentError::Sim(SimError::NoSuchNet(_)))));
    assert_eq!(harness.endpoint().steps, 4);
    assert_eq!(harness.cycles(), 1);
}
