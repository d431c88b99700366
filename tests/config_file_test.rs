use anyhow::Result;
use ddp_launch::core::report::{read_report, write_report};
use ddp_launch::core::SearchStatus;
use ddp_launch::utils::validation::Validate;
use ddp_launch::{
    resolve_plan, AutoConfirm, DryRunLauncher, EnvSnapshot, LaunchError, LaunchFile,
    PlanOverrides, PortSearch, PromptPolicy,
};
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("launch.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_plan_from_config_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_config(
        &dir,
        r#"
[launch]
launcher = "python -m torch.distributed.launch"
entry = "tools/train.py"
params = ["config=configs/unet.yaml"]

[devices]
list = "0,1,2,3"

[ports]
start = 31000
end = 31009

[prompt]
policy = "never"

[threads]
omp_num_threads = 4

[env]
NCCL_P2P_DISABLE = "1"
"#,
    );

    let file = LaunchFile::from_file(&path)?;
    let plan = resolve_plan(Some(&file), &EnvSnapshot::default(), &PlanOverrides::default())?;
    plan.validate()?;

    assert_eq!(plan.nproc_per_node(), 4);
    assert_eq!(plan.ports.start(), 31000);
    assert_eq!(plan.ports.len(), 10);
    assert_eq!(plan.prompt_policy, PromptPolicy::Never);
    assert_eq!(plan.omp_num_threads, 4);

    let command = plan.command_for(31000);
    assert_eq!(command.program, "python");
    assert_eq!(
        command.args(),
        vec![
            "-m",
            "torch.distributed.launch",
            "--nproc_per_node=4",
            "--master_port=31000",
            "tools/train.py",
            "with",
            "config=configs/unet.yaml",
        ]
    );
    assert_eq!(command.env_value("NCCL_P2P_DISABLE"), Some("1"));
    Ok(())
}

#[test]
fn test_env_substitution_in_config_file() -> Result<()> {
    std::env::set_var("DDP_LAUNCH_TEST_ENTRY_DIR", "/opt/project");
    let dir = TempDir::new()?;
    let path = write_config(
        &dir,
        "[launch]\nentry = \"${DDP_LAUNCH_TEST_ENTRY_DIR}/train.py\"\n[devices]\nlist = \"0\"\n",
    );

    let file = LaunchFile::from_file(&path)?;
    assert_eq!(file.launch.entry.as_deref(), Some("/opt/project/train.py"));
    Ok(())
}

#[test]
fn test_missing_config_file_is_a_config_error() {
    let err = LaunchFile::from_file("/definitely/not/here/launch.toml").unwrap_err();
    assert!(matches!(err, LaunchError::ConfigParseError { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_malformed_config_file_reports_path() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_config(&dir, "[ports\nstart = 1\n");

    let err = LaunchFile::from_file(&path).unwrap_err();
    match err {
        LaunchError::ConfigParseError { path: reported, .. } => {
            assert!(reported.ends_with("launch.toml"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_dry_run_report_round_trips_through_disk() -> Result<()> {
    let dir = TempDir::new()?;
    let env = EnvSnapshot::from_pairs([("CUDA_VISIBLE_DEVICES", "0,1")]);
    let plan = resolve_plan(None, &env, &PlanOverrides::default())?;

    let mut search = PortSearch::new(DryRunLauncher::new(), AutoConfirm::new(true));
    let outcome = search.run(&plan).await?;
    assert_eq!(search.launcher().issued().len(), 1);

    let report_path = dir.path().join("reports").join("launch.json");
    write_report(&outcome, &report_path)?;

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_path)?)?;
    assert_eq!(raw["status"], "found");
    assert_eq!(raw["selected_port"], 29500);
    assert_eq!(raw["attempts"][0]["outcome"]["kind"], "succeeded");

    let restored = read_report(&report_path)?;
    assert_eq!(restored.status, SearchStatus::Found);
    assert_eq!(restored.nproc_per_node, 2);
    Ok(())
}
