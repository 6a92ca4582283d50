//! Generate scenarios into a temporary directory and validate them back.

use std::fs;
use std::path::Path;

use startrace::validate::{GroundAerialRules, OrbitalRules};
use startrace::{
    generate_ground_aerial, generate_orbital, validate_dir, Catalog, ConfigError, Error, Fleet, GenerationError,
    J2Propagator, Rule, ScenarioConfig, ValidationRules, Verdict, Wgs84,
};
use tempfile::TempDir;

const CATALOG: &str = "\
STARLINK-1007
1 44713U 19074A   26027.50000000  .00001103  00000-0  93460-4 0  9993
2 44713  53.0537 162.4100 0001368  88.8870 271.2277 15.06391775 00007
ISS (ZARYA)
1 25544U 98067A   24001.50000000  .00016717  00000-0  10270-3 0  9009
2 25544  51.6400 208.5000 0007417  68.0000 292.1000 15.49560000400004
STARLINK-1008
1 44714U 19074A   26027.50000000  .00001103  00000-0  93460-4 0  9994
2 44714  53.0537 162.4100 0001368  88.8870 301.2277 15.06391775 00002
STARLINK-1009
1 44715U 19074A   26027.50000000  .00001103  00000-0  93460-4 0  9995
2 44715  53.0537 142.4100 0001368  88.8870 331.2277 15.06391775 00004
";

fn orbital_config(root: &Path) -> ScenarioConfig {
    ScenarioConfig {
        scenario_name: "orbital_rt".into(),
        duration_ms: 120_000,
        // Every catalog node qualifies, wherever it is at the epoch.
        max_range_km: 1.0e6,
        output_root: root.to_path_buf(),
        ..ScenarioConfig::default()
    }
}

fn fleet_config(root: &Path) -> ScenarioConfig {
    ScenarioConfig {
        scenario_name: "fleet_rt".into(),
        output_root: root.to_path_buf(),
        ..ScenarioConfig::ground_aerial()
    }
}

fn only_fleet_rules(config: &ScenarioConfig) -> ValidationRules {
    ValidationRules {
        ground_aerial: GroundAerialRules::for_scenario(config, Fleet::reference().group_size()),
        ..ValidationRules::default()
    }
}

#[test]
fn test_orbital_round_trip() {
    let dir = TempDir::new().unwrap();
    let cfg = orbital_config(dir.path());
    let catalog = Catalog::from_tle_str(CATALOG, cfg.catalog_filter.as_deref()).unwrap();
    assert_eq!(catalog.len(), 3);

    let manifest = generate_orbital(&catalog, &J2Propagator, &Wgs84, &Wgs84, &cfg).unwrap();
    assert_eq!(manifest.node_count, 3);
    assert_eq!(manifest.trace_files, ["sat_trace_0_59999.csv", "sat_trace_60000_119999.csv"]);

    let text = fs::read_to_string(cfg.trace_dir().join("sat_trace_0_59999.csv")).unwrap();
    assert_eq!(text.lines().count(), 1 + 60 * 3);
    assert!(text.lines().nth(1).unwrap().starts_with("0,SAT_01,STARLINK-"));

    let rules = ValidationRules {
        orbital: OrbitalRules::for_scenario(&cfg, manifest.node_count),
        ..ValidationRules::default()
    };
    let report = validate_dir(&cfg.trace_dir(), &rules, &Wgs84).unwrap();
    assert_eq!(report.files.len(), 2);
    assert!(report.all_passed(), "{report}");
}

#[test]
fn test_reference_fleet_passes_default_rules() {
    let dir = TempDir::new().unwrap();
    let cfg = fleet_config(dir.path());

    let manifest = generate_ground_aerial(&Fleet::reference(), &cfg).unwrap();
    assert_eq!(manifest.trace_files.len(), 10);
    assert_eq!(manifest.trace_files[9], "uav_trace_540000_599999.csv");

    for name in &manifest.trace_files {
        let text = fs::read_to_string(cfg.trace_dir().join(name)).unwrap();
        assert_eq!(text.lines().count(), 1 + 2400);
    }

    let report = validate_dir(&cfg.trace_dir(), &ValidationRules::default(), &Wgs84).unwrap();
    assert_eq!(report.passed(), 10);
    assert!(report.skipped.is_empty());
    assert!(report.all_passed(), "{report}");
}

#[test]
fn test_deleted_row_is_rejected() {
    let dir = TempDir::new().unwrap();
    let cfg = ScenarioConfig {
        duration_ms: 120_000,
        ..fleet_config(dir.path())
    };
    generate_ground_aerial(&Fleet::reference(), &cfg).unwrap();

    let path = cfg.trace_dir().join("uav_trace_60000_119999.csv");
    let text = fs::read_to_string(&path).unwrap();
    let kept: Vec<&str> = text
        .lines()
        .enumerate()
        .filter(|&(i, _)| i != 2)
        .map(|(_, line)| line)
        .collect();
    fs::write(&path, kept.join("\n") + "\n").unwrap();

    let report = validate_dir(&cfg.trace_dir(), &only_fleet_rules(&cfg), &Wgs84).unwrap();
    assert_eq!(report.passed(), 1);
    let rejected = &report.files[1];
    assert_eq!(rejected.file, "uav_trace_60000_119999.csv");
    match &rejected.verdict {
        Verdict::Fail(v) => {
            assert_eq!(v.rule, Rule::RowsPerTimestamp);
            assert_eq!(v.samples, ["60000ms: 3"]);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!report.all_passed());
}

#[test]
fn test_regeneration_is_byte_identical() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let a = ScenarioConfig {
        duration_ms: 120_000,
        ..fleet_config(first.path())
    };
    let b = ScenarioConfig {
        output_root: second.path().to_path_buf(),
        ..a.clone()
    };

    let manifest = generate_ground_aerial(&Fleet::reference(), &a).unwrap();
    generate_ground_aerial(&Fleet::reference(), &b).unwrap();
    // Overwriting in place gives the same bytes as well.
    generate_ground_aerial(&Fleet::reference(), &b).unwrap();

    for name in &manifest.trace_files {
        let left = fs::read(a.trace_dir().join(name)).unwrap();
        let right = fs::read(b.trace_dir().join(name)).unwrap();
        assert!(left == right, "{name} differs between runs");
    }
    assert_eq!(
        fs::read(a.manifest_path()).unwrap(),
        fs::read(b.manifest_path()).unwrap()
    );
}

#[test]
fn test_orbital_regeneration_is_byte_identical() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let a = orbital_config(first.path());
    let b = ScenarioConfig {
        output_root: second.path().to_path_buf(),
        ..a.clone()
    };

    let catalog = Catalog::from_tle_str(CATALOG, a.catalog_filter.as_deref()).unwrap();
    let manifest = generate_orbital(&catalog, &J2Propagator, &Wgs84, &Wgs84, &a).unwrap();
    // A freshly parsed catalog, so nothing is shared between the two runs.
    let reparsed = Catalog::from_tle_str(CATALOG, b.catalog_filter.as_deref()).unwrap();
    generate_orbital(&reparsed, &J2Propagator, &Wgs84, &Wgs84, &b).unwrap();

    for name in &manifest.trace_files {
        let left = fs::read(a.trace_dir().join(name)).unwrap();
        let right = fs::read(b.trace_dir().join(name)).unwrap();
        assert!(left == right, "{name} differs between runs");
    }
    assert_eq!(
        fs::read(a.manifest_path()).unwrap(),
        fs::read(b.manifest_path()).unwrap()
    );
}

#[test]
fn test_out_of_range_fleet_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let cfg = fleet_config(dir.path());
    let mut fleet = Fleet::reference();
    fleet.aerial[2].anchor.alt_m = 2_000_000.0;

    match generate_ground_aerial(&fleet, &cfg) {
        Err(Error::Generation(GenerationError::OutOfBounds(v))) => {
            assert_eq!(v.rule, Rule::Radius);
            assert!(v.samples[0].starts_with("UAV_03@0ms"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!cfg.scenario_dir().exists());
}

#[test]
fn test_chunks_share_no_timestamps() {
    let dir = TempDir::new().unwrap();
    let cfg = ScenarioConfig {
        duration_ms: 180_000,
        ..fleet_config(dir.path())
    };
    let manifest = generate_ground_aerial(&Fleet::reference(), &cfg).unwrap();

    let mut previous_last: Option<u64> = None;
    for name in &manifest.trace_files {
        let mut reader = csv::Reader::from_path(cfg.trace_dir().join(name)).unwrap();
        let times: Vec<u64> = reader
            .records()
            .map(|r| r.unwrap()[0].parse().unwrap())
            .collect();
        let (first, last) = (times[0], times[times.len() - 1]);
        if let Some(prev) = previous_last {
            assert_eq!(first, prev + cfg.step_ms);
        }
        assert!(name.ends_with(&format!("_{}.csv", first + cfg.chunk_duration_ms - 1)));
        previous_last = Some(last);
    }
    assert_eq!(previous_last, Some(179_900));
}

#[test]
fn test_bad_config_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let cfg = ScenarioConfig {
        duration_ms: 90_000,
        ..fleet_config(dir.path())
    };

    let err = generate_ground_aerial(&Fleet::reference(), &cfg).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::DurationNotMultipleOfChunk { .. })
    ));
    assert!(!cfg.scenario_dir().exists());
}

#[test]
fn test_unknown_files_are_skipped() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.csv"), "a,b\n1,2\n").unwrap();
    fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

    let report = validate_dir(dir.path(), &ValidationRules::default(), &Wgs84).unwrap();
    assert!(report.files.is_empty());
    assert_eq!(report.skipped, ["notes.csv"]);
    assert!(!report.all_passed());
}
