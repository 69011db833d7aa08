#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use chimp_stress::cli::StressArgs;
use chimp_stress::domain::StressRequest;
use chimp_stress::error::StressError;
use chimp_stress::validation::validate_args;

fn args(test: &str) -> StressArgs {
    StressArgs {
        test: test.into(),
        seconds: Some(30),
        ..StressArgs::default()
    }
}

fn message(r: Result<StressRequest, StressError>) -> String {
    match r {
        Err(StressError::Validation(m)) => m,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn ok_ram() {
    let a = StressArgs {
        percent: Some(95),
        ..args("ram")
    };
    assert_eq!(
        validate_args(&a).expect("ok"),
        StressRequest::Memory {
            target_percent: 95,
            duration_seconds: 30
        }
    );
}

#[test]
fn ok_hdd_trims_volumes() {
    let a = StressArgs {
        percent: Some(90),
        volumes: vec!["/".into(), " /sda1 ".into(), String::new()],
        ..args("hdd")
    };
    assert_eq!(
        validate_args(&a).expect("ok"),
        StressRequest::Disk {
            target_percent: 90,
            duration_seconds: 30,
            volumes: vec!["/".into(), "/sda1".into()]
        }
    );
}

#[test]
fn ok_cpu_and_net() {
    let c = StressArgs {
        core_count: Some(9999),
        ..args("cpu")
    };
    assert!(matches!(
        validate_args(&c),
        Ok(StressRequest::Cpu {
            core_count: 9999,
            ..
        })
    ));
    let n = StressArgs {
        interface: Some("eth0".into()),
        hostname: Some("peer.example".into()),
        ..args("net")
    };
    assert!(matches!(validate_args(&n), Ok(StressRequest::Network { .. })));
}

#[test]
fn err_missing_seconds() {
    let a = StressArgs {
        seconds: None,
        percent: Some(50),
        ..args("ram")
    };
    assert!(message(validate_args(&a)).contains("--seconds is required"));
}

#[test]
fn err_non_positive_values() {
    let a = StressArgs {
        seconds: Some(0),
        percent: Some(-5),
        ..args("ram")
    };
    let m = message(validate_args(&a));
    assert!(m.contains("--seconds must be positive"));
    assert!(m.contains("--percent must be positive"));
}

#[test]
fn err_percent_over_hundred() {
    let a = StressArgs {
        percent: Some(101),
        ..args("ram")
    };
    assert!(message(validate_args(&a)).contains("at most 100"));
}

#[test]
fn err_hdd_names_every_missing_parameter() {
    let m = message(validate_args(&args("hdd")));
    assert!(m.starts_with("hdd test"));
    assert!(m.contains("--percent is required"));
    assert!(m.contains("--volumes is required"));
}

#[test]
fn err_cpu_core_count() {
    assert!(message(validate_args(&args("cpu"))).contains("--core_count is required"));
    let a = StressArgs {
        core_count: Some(0),
        ..args("cpu")
    };
    assert!(message(validate_args(&a)).contains("--core_count must be positive"));
}

#[test]
fn err_net_empty_interface() {
    let a = StressArgs {
        interface: Some("  ".into()),
        ..args("net")
    };
    let m = message(validate_args(&a));
    assert!(m.contains("--interface is required"));
    assert!(m.contains("--hostname is required"));
}

#[test]
fn err_kind_unsupported() {
    assert!(message(validate_args(&args("gpu"))).contains("invalid test name"));
}
