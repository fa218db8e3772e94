use rstest::rstest;
use std::time::Duration;
use weigh_link::SimulatedIndicator;
use weigh_traits::Transport;

fn drain(sim: &mut SimulatedIndicator, n: usize) -> Vec<String> {
    (0..n)
        .filter_map(|_| sim.try_read_line().expect("sim read"))
        .collect()
}

#[rstest]
fn reading_while_closed_is_an_error() {
    let mut sim = SimulatedIndicator::with_period(12.5, Duration::ZERO);
    assert!(sim.try_read_line().is_err());
    assert!(!sim.is_open());
}

#[rstest]
fn cycle_starts_at_zero_and_reaches_the_plateau() {
    let mut sim = SimulatedIndicator::with_period(12.5, Duration::ZERO);
    sim.connect("SIM", 9600).unwrap();
    assert!(sim.is_open());

    let frames = drain(&mut sim, 60);
    assert_eq!(frames.len(), 60, "zero period emits a frame per poll");
    assert!(frames[0].contains("00000.00"), "cycle opens empty: {}", frames[0]);
    assert!(
        frames.iter().any(|f| f.contains("00012.50")),
        "plateau frame present"
    );
    // Every frame is legacy-framed.
    for f in &frames {
        assert!(f.starts_with("ww") && f.ends_with("kg"), "framing: {f}");
    }
}

#[rstest]
fn plateau_repeats_identically_for_stabilization() {
    let mut sim = SimulatedIndicator::with_period(7.0, Duration::ZERO);
    sim.connect("SIM", 9600).unwrap();
    let frames = drain(&mut sim, 60);
    let plateau: Vec<_> = frames.iter().filter(|f| f.contains("00007.00")).collect();
    assert!(plateau.len() >= 40, "hold phase dominates the cycle");
}

#[rstest]
fn disconnect_then_reconnect_restarts_the_cycle() {
    let mut sim = SimulatedIndicator::with_period(5.0, Duration::ZERO);
    sim.connect("SIM", 9600).unwrap();
    let _ = drain(&mut sim, 25);
    sim.disconnect();
    assert!(!sim.is_open());
    sim.connect("SIM", 9600).unwrap();
    let first = sim.try_read_line().unwrap().unwrap();
    assert!(first.contains("00000.00"), "fresh cycle opens empty: {first}");
}
