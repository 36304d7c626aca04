//! # Integration Tests
//!
//! Cross-crate integration and end-to-end tests.
//!
//! Responsibilities:
//! - contract shape tests (serialized column names, config round trip)
//! - end-to-end sessions built from synthetic captured pages
//! - timing invariants checked over the whole engine output

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod e2e_tests;

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::session_time::from_secs_f64;
    use contracts::{ChannelTable, EngineConfig, LapRecord, PositionFrame, StreamSample};

    #[test]
    fn test_lap_table_columns() {
        let lap = LapRecord {
            end_time: Some(from_secs_f64(90.1)),
            lap_time: Some(from_secs_f64(90.1)),
            lap_number: Some(1),
            ..LapRecord::new("44".into())
        };
        let value = serde_json::to_value(&lap).unwrap();
        let object = value.as_object().unwrap();

        for column in [
            "Time",
            "LapTime",
            "Driver",
            "LapNumber",
            "PitStopCount",
            "PitInTime",
            "PitOutTime",
            "Sector1Time",
            "Sector2Time",
            "Sector3Time",
            "Sector1SessionTime",
            "Sector2SessionTime",
            "Sector3SessionTime",
            "SpeedI1",
            "SpeedI2",
            "SpeedFL",
            "SpeedST",
            "IsPersonalBest",
        ] {
            assert!(object.contains_key(column), "missing column {column}");
        }
        assert_eq!(object.len(), 18);
        assert_eq!(value["Time"], 90.1);
        assert_eq!(value["Driver"], "44");
        assert!(value["Sector1Time"].is_null());
    }

    #[test]
    fn test_stream_table_columns() {
        let sample = StreamSample {
            time: from_secs_f64(12.5),
            driver: "1".into(),
            position: Some(1),
            gap_to_leader: Some("LAP 3".to_string()),
            interval_to_ahead: None,
        };
        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["Time"], 12.5);
        assert_eq!(value["Position"], 1);
        assert_eq!(value["GapToLeader"], "LAP 3");
        assert!(value["IntervalToPositionAhead"].is_null());
    }

    #[test]
    fn test_position_table_source_tag() {
        let table = ChannelTable::<PositionFrame>::new("16".into());
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value["source"], "pos");
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = EngineConfig::default();
        config.timing.max_lap_time_ms = 200_000;
        config.alignment.enabled = false;

        let toml = ConfigLoader::to_toml(&config).unwrap();
        let parsed = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed, config);

        let json = ConfigLoader::to_json(&config).unwrap();
        let parsed = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(parsed, config);
    }
}
