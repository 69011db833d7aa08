#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::str::FromStr;

use chimp_stress::domain::{RunState, StatusBoard, StressKind, StressRequest};

#[test]
fn kind_from_cli_names() {
    assert_eq!(StressKind::from_str("ram").expect("ok"), StressKind::Memory);
    assert_eq!(StressKind::from_str("HDD").expect("ok"), StressKind::Disk);
    assert_eq!(StressKind::from_str("cpu").expect("ok"), StressKind::Cpu);
    assert_eq!(StressKind::from_str("net").expect("ok"), StressKind::Network);
    assert!(StressKind::from_str("gpu").is_err());
}

#[test]
fn happy_path_transitions() {
    let board = StatusBoard::default();
    assert_eq!(board.current(), RunState::Idle);
    assert!(board.transition(RunState::Validating));
    assert!(board.transition(RunState::Running(StressKind::Disk)));
    assert!(board.transition(RunState::Releasing));
    assert!(board.transition(RunState::Done));
    assert!(board.current().is_terminal());
    assert_eq!(board.snapshot(0).kind, Some(StressKind::Disk));
}

#[test]
fn failure_transitions() {
    assert!(RunState::Validating.can_transition_to(RunState::Failed));
    assert!(RunState::Running(StressKind::Cpu).can_transition_to(RunState::Failed));
    assert!(RunState::Releasing.can_transition_to(RunState::Failed));
}

#[test]
fn illegal_transitions_are_rejected() {
    let board = StatusBoard::default();
    assert!(!board.transition(RunState::Running(StressKind::Memory)));
    assert!(!board.transition(RunState::Done));
    assert_eq!(board.current(), RunState::Idle);

    assert!(!RunState::Done.can_transition_to(RunState::Validating));
    assert!(!RunState::Failed.can_transition_to(RunState::Done));
    assert!(!RunState::Validating.can_transition_to(RunState::Done));
}

#[test]
fn remaining_seconds_counts_down() {
    let board = StatusBoard::default();
    board.begin_hold(5, 1000);
    assert_eq!(board.snapshot(1000).remaining_seconds, 5);
    assert_eq!(board.snapshot(1003).remaining_seconds, 2);
    assert_eq!(board.snapshot(2000).remaining_seconds, 0);
}

#[test]
fn request_accessors() {
    let r = StressRequest::Disk {
        target_percent: 90,
        duration_seconds: 30,
        volumes: vec!["/".into()],
    };
    assert_eq!(r.kind(), StressKind::Disk);
    assert_eq!(r.duration_seconds(), 30);
    assert_eq!(r.target_percent(), Some(90));
    let c = StressRequest::Cpu {
        duration_seconds: 1,
        core_count: 2,
    };
    assert_eq!(c.target_percent(), None);
}
