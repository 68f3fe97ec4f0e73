use super::*;
use crate::cli::{Cli, EngineArg};
use clap::Parser;

fn global(args: &[&str]) -> GlobalArgs {
    let mut argv = vec!["tidemark"];
    argv.extend_from_slice(args);
    argv.push("status");
    Cli::try_parse_from(argv).unwrap().global
}

#[test]
fn test_defaults_without_config_file() {
    let root = PathBuf::from("/srv/app");
    let mut args = global(&[]);
    args.engine = None;
    args.table = None;
    args.database = None;

    let settings = Settings::resolve(&Config::default(), &args, &root);
    assert_eq!(settings.roots, vec![root.join("migrations")]);
    assert_eq!(settings.database, root.join("tidemark.duckdb").display().to_string());
    assert_eq!(settings.engine, StateEngine::Duckdb);
    assert_eq!(settings.table, "tidemark_migrations");
    assert!(!settings.migrate_dependencies);
    assert!(!settings.dry_run);
}

#[test]
fn test_flags_override_config() {
    let root = PathBuf::from("/srv/app");
    let config: Config = load_config(
        "directories: [db]\ndatabase:\n  path: app.duckdb\nstate:\n  engine: duckdb\n  table: from_file\n",
    );
    let mut args = global(&["-d", "other", "-d", "/abs/dir", "--dry-run"]);
    args.engine = Some(EngineArg::Memory);
    args.table = Some("from_flag".to_string());
    args.database = Some(":memory:".to_string());

    let settings = Settings::resolve(&config, &args, &root);
    assert_eq!(
        settings.roots,
        vec![root.join("other"), PathBuf::from("/abs/dir")]
    );
    assert_eq!(settings.database, ":memory:");
    assert_eq!(settings.engine, StateEngine::Memory);
    assert_eq!(settings.table, "from_flag");
    assert!(settings.dry_run);
}

#[test]
fn test_config_used_when_flags_absent() {
    let root = PathBuf::from("/srv/app");
    let config = load_config(
        "directories: [db]\nstate:\n  engine: memory\n  table: from_file\nmigrate_dependencies: true\n",
    );
    let mut args = global(&[]);
    args.engine = None;
    args.table = None;
    args.database = Some("rel.duckdb".to_string());

    let settings = Settings::resolve(&config, &args, &root);
    assert_eq!(settings.roots, vec![root.join("db")]);
    assert_eq!(settings.database, root.join("rel.duckdb").display().to_string());
    assert_eq!(settings.engine, StateEngine::Memory);
    assert_eq!(settings.table, "from_file");
    assert!(settings.migrate_dependencies);
}

#[test]
fn test_context_loads_project_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("tidemark.yml"),
        "state:\n  table: project_history\n",
    )
    .unwrap();
    let mut args = global(&["-p", dir.path().to_str().unwrap()]);
    args.table = None;

    let ctx = RuntimeContext::new(&args).unwrap();
    assert_eq!(ctx.settings.table, "project_history");
    assert_eq!(ctx.settings.roots, vec![dir.path().join("migrations")]);
}

#[test]
fn test_context_reports_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tidemark.yml"), "unknown_key: 1\n").unwrap();
    let args = global(&["-p", dir.path().to_str().unwrap()]);
    assert!(RuntimeContext::new(&args).is_err());
}

#[test]
fn test_file_target_falls_back_to_its_directory() {
    let project = tempfile::tempdir().unwrap();
    let mut args = global(&[]);
    args.database = None;
    let settings = Settings::resolve(&Config::default(), &args, project.path());
    assert!(!settings.roots_explicit);

    let target = project.path().join("other/20240101000000_x.yml");
    assert_eq!(
        settings.roots_for_target(&target),
        vec![project.path().join("other")]
    );
    assert_eq!(
        settings.roots_for_target(Path::new("20240101000000_x.yml")),
        vec![PathBuf::from(".")]
    );

    // Once the default root exists it is searched as usual.
    std::fs::create_dir_all(project.path().join("migrations")).unwrap();
    assert_eq!(settings.roots_for_target(&target), settings.roots);
}

#[test]
fn test_explicit_roots_kept_for_file_target() {
    let project = tempfile::tempdir().unwrap();
    let args = global(&["-d", "missing"]);
    let settings = Settings::resolve(&Config::default(), &args, project.path());
    assert!(settings.roots_explicit);

    let target = project.path().join("other/20240101000000_x.yml");
    assert_eq!(
        settings.roots_for_target(&target),
        vec![project.path().join("missing")]
    );

    let config = load_config("directories: [db]\n");
    let settings = Settings::resolve(&config, &global(&[]), project.path());
    assert!(settings.roots_explicit);
}

fn load_config(yaml: &str) -> Config {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tidemark.yml");
    std::fs::write(&path, yaml).unwrap();
    Config::load(&path).unwrap()
}
