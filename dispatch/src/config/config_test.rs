use super::{dates::DateSpec, ConfigErrors, DispatchConfig};
use chrono::NaiveDate;
use std::path::PathBuf;

const CONFIG: &str = r#"
dates:
  start: 01-03-2024
  end: today
query:
  keyword1: wastewater
  keyword2: sars-cov-2
process_configs:
  on_chtc: true
  cpu_per_node: 4
  max_cpu_request: 16
  minimum_submissions_for_balancing: 10
  disk_ceiling_per_node: 400GB
  memory_request: 8
directory:
  output_results: /staging/results
files:
  sra_list_folder: sras_to_process
  sra_query_file: sra_queue.txt
  sra_metadata_table: ww_meta.tsv
"#;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

#[test]
pub fn parses_full_config() {
    let config = DispatchConfig::from_yaml(CONFIG).unwrap();
    let global = config.global();

    assert!(config.process_configs.on_chtc);
    assert_eq!(global.cpu_per_node, 4);
    assert_eq!(global.max_cpu_request, 16);
    assert_eq!(global.minimum_submissions_for_balancing, 10);
    assert_eq!(global.disk_ceiling_per_node, 400_000_000_000);
    assert_eq!(global.max_nodes, None);
    assert_eq!(global.memory_request, Some(8));
    assert_eq!(config.files.submit_manifest, PathBuf::from("submit_configs.yaml"));
    assert!(!config.preflight_checks(today()));
}

#[test]
pub fn today_as_end_means_yesterday() {
    let config = DispatchConfig::from_yaml(CONFIG).unwrap();
    let params = config.query_params(today());

    assert_eq!(params.start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    assert_eq!(params.end, NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
    assert_eq!(params.search_term(), "wastewater sars-cov-2");
}

#[test]
pub fn today_as_start_means_today() {
    assert_eq!(DateSpec::Today.resolve_start(today()), today());
    assert_eq!(
        DateSpec::Today.resolve_end(today()),
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    );
}

#[test]
pub fn accepts_json_configs() {
    let json = r#"{
        "dates": {"start": "01-01-2024", "end": "31-01-2024"},
        "query": {"keyword1": "wastewater", "keyword2": 2},
        "process_configs": {
            "on_chtc": false,
            "cpu_per_node": 2,
            "max_cpu_request": 8,
            "minimum_submissions_for_balancing": 5,
            "disk_ceiling_per_node": 1000000000,
            "max_nodes": 3
        },
        "directory": {"output_results": "out"},
        "files": {
            "sra_list_folder": "lists",
            "sra_query_file": "queue.txt",
            "sra_metadata_table": "meta.tsv",
            "submit_manifest": "directives.yaml"
        }
    }"#;
    let config = DispatchConfig::from_yaml(json).unwrap();

    assert_eq!(config.global().disk_ceiling_per_node, 1_000_000_000);
    assert_eq!(config.global().max_nodes, Some(3));
    assert_eq!(config.query_params(today()).search_term(), "wastewater 2");
    assert!(!config.preflight_checks(today()));
}

#[test]
pub fn rejects_malformed_dates_at_parse_time() {
    let broken = CONFIG.replace("01-03-2024", "2024-03-01");

    assert!(matches!(
        DispatchConfig::from_yaml(&broken),
        Err(ConfigErrors::Parse(_))
    ));
}

#[test]
pub fn rejects_unknown_fields() {
    let broken = CONFIG.replace("  memory_request: 8", "  memory_request: 8\n  gpus: 1");

    assert!(DispatchConfig::from_yaml(&broken).is_err());
}

#[test]
pub fn preflight_catches_inverted_dates() {
    let config = DispatchConfig::from_yaml(&CONFIG.replace("end: today", "end: 01-02-2024")).unwrap();

    assert!(config.preflight_checks(today()));
}

#[test]
pub fn preflight_catches_cpu_above_cap() {
    let config =
        DispatchConfig::from_yaml(&CONFIG.replace("cpu_per_node: 4", "cpu_per_node: 32")).unwrap();

    assert_eq!(config.global().violations().len(), 1);
    assert!(config.preflight_checks(today()));
}

#[test]
pub fn preflight_catches_zero_threshold_and_ceiling() {
    let config = DispatchConfig::from_yaml(
        &CONFIG
            .replace("minimum_submissions_for_balancing: 10", "minimum_submissions_for_balancing: 0")
            .replace("disk_ceiling_per_node: 400GB", "disk_ceiling_per_node: 0"),
    )
    .unwrap();

    assert_eq!(config.global().violations().len(), 2);
    assert!(config.preflight_checks(today()));
}

#[test]
pub fn preflight_catches_empty_query() {
    let config = DispatchConfig::from_yaml(&CONFIG.replace(
        "query:\n  keyword1: wastewater\n  keyword2: sars-cov-2\n",
        "query: {}\n",
    ))
    .unwrap();

    assert!(config.query.is_empty());

    assert!(config.preflight_checks(today()));
}

#[test]
pub fn load_reports_missing_file() {
    let result = DispatchConfig::load(&PathBuf::from("/definitely/not/here/config.yaml"));

    assert!(matches!(result, Err(ConfigErrors::Io { .. })));
}
