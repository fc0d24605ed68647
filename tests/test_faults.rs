use tidegate::server::PacketLossSimulator;

#[test]
fn test_zero_probability_admits_everything() {
    let gate = PacketLossSimulator::new(0.0);

    for _ in 0..1000 {
        assert!(gate.should_admit());
    }
}

#[test]
fn test_full_probability_drops_everything() {
    let gate = PacketLossSimulator::new(1.0);

    for _ in 0..1000 {
        assert!(!gate.should_admit());
    }
}

#[test]
fn test_probability_is_clamped_to_unit_interval() {
    assert_eq!(PacketLossSimulator::new(1.5).drop_probability(), 1.0);
    assert_eq!(PacketLossSimulator::new(-0.25).drop_probability(), 0.0);
    assert_eq!(PacketLossSimulator::new(0.2).drop_probability(), 0.2);
}

#[test]
fn test_seeded_gate_admits_roughly_the_expected_share() {
    let gate = PacketLossSimulator::with_seed(0.2, 42);

    let trials = 100_000;
    let admitted = (0..trials).filter(|_| gate.should_admit()).count();

    // Expected 80_000 admissions; a fixed seed keeps the exact count stable,
    // the wide band just guards against RNG implementation changes.
    assert!(
        (78_500..=81_500).contains(&admitted),
        "admitted {admitted} of {trials}"
    );
}

#[test]
fn test_same_seed_gives_same_decisions() {
    let first = PacketLossSimulator::with_seed(0.5, 7);
    let second = PacketLossSimulator::with_seed(0.5, 7);

    let a: Vec<bool> = (0..100).map(|_| first.should_admit()).collect();
    let b: Vec<bool> = (0..100).map(|_| second.should_admit()).collect();
    assert_eq!(a, b);
}

#[test]
fn test_different_seeds_diverge() {
    let first = PacketLossSimulator::with_seed(0.5, 1);
    let second = PacketLossSimulator::with_seed(0.5, 2);

    let a: Vec<bool> = (0..100).map(|_| first.should_admit()).collect();
    let b: Vec<bool> = (0..100).map(|_| second.should_admit()).collect();
    assert_ne!(a, b);
}
