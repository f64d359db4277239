//! Integration tests: plant, regulator and Smith predictor driven through a
//! shared bus the way a closed-loop driver would drive them.

use sp_controls::{ControlError, Plant, PlantParams, PidParams, PidRegulator, SmithPredictor};
use sp_core::{Real, Tolerances, nearly_equal};
use sp_signal::{Forced, SignalBus, SignalError};

const DT: Real = 0.01;

#[test]
fn plant_step_response_is_a_first_order_lag() {
    let mut bus = SignalBus::new();
    let u = bus.add_forced("u", Forced::new(0, 0, |_| 1.0).unwrap());
    let plant = Plant::new(&mut bus, "drone", PlantParams::new(3.0, 0.13, 0).unwrap(), 0.0).unwrap();
    plant.connect_input(&mut bus, u).unwrap();

    let mut previous = 0.0;
    for _ in 0..500 {
        bus.step(u, DT).unwrap();
        plant.step(&mut bus, DT).unwrap();
        let y = bus.get(plant.output(), 0).unwrap();
        assert!(y >= previous - 1e-12, "response must rise monotonically");
        assert!(y <= 3.0 + 1e-12, "no overshoot");
        previous = y;
    }
    assert!((previous - 3.0).abs() < 1e-6);
}

#[test]
fn plant_delayed_output_trails_by_its_dead_time() {
    let mut bus = SignalBus::new();
    let u = bus.add_forced("u", Forced::new(0, 0, |_| 1.0).unwrap());
    let plant = Plant::new(&mut bus, "drone", PlantParams::new(1.0, 0.16, 1).unwrap(), 0.2).unwrap();
    plant.connect_input(&mut bus, u).unwrap();

    let mut outputs = Vec::new();
    let mut delayed = Vec::new();
    for _ in 0..100 {
        bus.step(u, DT).unwrap();
        plant.step(&mut bus, DT).unwrap();
        outputs.push(bus.values(plant.output()).unwrap().to_vec());
        delayed.push(bus.values(plant.delayed_output()).unwrap().to_vec());
    }

    // 0.2 s at 0.01 s per step: the delayed view replays the state 19 steps
    // back once 20 snapshots are buffered
    let tol = Tolerances {
        abs: 1e-9,
        rel: 1e-9,
    };
    assert!(delayed[..19].iter().all(|v| v.iter().all(|x| *x == 0.0)));
    for n in 25..outputs.len() {
        for (d, o) in delayed[n].iter().zip(&outputs[n - 19]) {
            assert!(nearly_equal(*d, *o, tol), "step {n}: {d} vs {o}");
        }
    }
}

#[test]
fn pid_reduces_to_proportional_action() {
    let mut bus = SignalBus::new();
    let e = bus.add_forced("e", Forced::new(0, 0, |_| -1.5).unwrap());
    let pid = PidRegulator::new(&mut bus, "pid", PidParams::new(1.0, Real::INFINITY, 0.0).unwrap())
        .unwrap();
    pid.connect_input(&mut bus, e).unwrap();

    for _ in 0..10 {
        bus.step(e, DT).unwrap();
        pid.step(&mut bus, DT).unwrap();
    }
    assert!((bus.get(pid.output(), 0).unwrap() + 1.5).abs() < 1e-12);
}

#[test]
fn smith_error_reduces_to_command_with_zero_delay() {
    let mut bus = SignalBus::new();
    let cmd = bus.add_forced("cmd", Forced::new(0, 0, |t| if t > 0.1 { 1.0 } else { 0.0 }).unwrap());
    let smith = SmithPredictor::new(
        &mut bus,
        "smith",
        PlantParams::new(1.0, 0.16, 1).unwrap(),
        PidParams::new(6.0, 20.0, 0.2).unwrap(),
        0.0,
    )
    .unwrap();
    smith.connect_input(&mut bus, cmd).unwrap();

    for _ in 0..300 {
        bus.step(cmd, DT).unwrap();
        smith.step(&mut bus, DT).unwrap();
        // the delayed view equals the model output, so both model terms cancel
        assert_eq!(
            bus.values(smith.model().delayed_output()).unwrap(),
            bus.values(smith.model().output()).unwrap()
        );
        assert!((bus.get(smith.error(), 0).unwrap() - bus.get(cmd, 0).unwrap()).abs() < 1e-12);
    }
    assert!(bus.get(smith.model().output(), 0).unwrap() > 0.0);
}

#[test]
fn smith_tick_order_drives_every_owned_signal() {
    let mut bus = SignalBus::new();
    let cmd = bus.add_forced("cmd", Forced::new(0, 0, |_| 1.0).unwrap());
    let a = SmithPredictor::new(
        &mut bus,
        "a",
        PlantParams::new(3.0, 0.13, 2).unwrap(),
        PidParams::new(0.2, 20.0, 14.0).unwrap(),
        0.22,
    )
    .unwrap();
    let b = SmithPredictor::new(
        &mut bus,
        "b",
        PlantParams::new(3.0, 0.13, 2).unwrap(),
        PidParams::new(0.2, 20.0, 14.0).unwrap(),
        0.22,
    )
    .unwrap();
    a.connect_input(&mut bus, cmd).unwrap();
    b.connect_input(&mut bus, cmd).unwrap();

    // stepping through step() and through the listed order must agree
    for _ in 0..100 {
        bus.step(cmd, DT).unwrap();
        a.step(&mut bus, DT).unwrap();
        bus.step_in_order(&b.tick_order(), DT).unwrap();
    }
    assert_eq!(
        bus.values(a.model().output()).unwrap(),
        bus.values(b.model().output()).unwrap()
    );
    assert_eq!(bus.get(a.output(), 0).unwrap(), bus.get(b.output(), 0).unwrap());
}

#[test]
fn division_guards() {
    assert!(matches!(
        PlantParams::new(3.0, 0.0, 0),
        Err(ControlError::Configuration { .. })
    ));
    assert!(matches!(
        PidParams::new(1.0, 0.0, 0.0),
        Err(ControlError::Configuration { .. })
    ));

    let mut bus = SignalBus::new();
    let u = bus.add_forced("u", Forced::new(0, 0, |_| 1.0).unwrap());
    let plant = Plant::new(&mut bus, "drone", PlantParams::new(3.0, 0.13, 0).unwrap(), 0.1).unwrap();
    plant.connect_input(&mut bus, u).unwrap();
    for h in [0.0, -DT, Real::NAN] {
        assert!(matches!(
            plant.step(&mut bus, h),
            Err(ControlError::Signal(SignalError::Domain { .. }))
        ));
    }
    assert!(matches!(bus.step(u, 0.0), Err(SignalError::Domain { .. })));
    assert_eq!(bus.get(plant.output(), 0).unwrap(), 0.0);
}

#[test]
fn unwired_composites_report_their_label() {
    let mut bus = SignalBus::new();
    let pid = PidRegulator::new(&mut bus, "lateral", PidParams::proportional(1.0).unwrap()).unwrap();
    match pid.step(&mut bus, DT) {
        Err(ControlError::Signal(SignalError::UninitializedReference { what })) => {
            assert!(what.contains("lateral.shaped_input"), "{what}");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
