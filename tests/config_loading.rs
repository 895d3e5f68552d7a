// tests/config_loading.rs

use std::io::Write;

use tempfile::NamedTempFile;

use dockhand::config::{load_and_validate, load_from_path};
use dockhand::errors::ConfigError;
use dockhand::format_task_list;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("creating temp file");
    file.write_all(contents.as_bytes()).expect("writing config");
    file
}

#[test]
fn a_full_config_round_trips_through_yaml() {
    let file = write_config(
        r#"
project_name: my-app

containers:
  build-env:
    build_directory: dev-infrastructure/build-env
    command: ./gradlew test
    working_directory: /code
    environment:
      GRADLE_OPTS: -Xmx512m
    volumes:
      - local: .
        container: /code
        options: cached
    ports:
      - local: 8080
        container: 80
  db:
    image: postgres:16

tasks:
  test:
    description: Run the test suite.
    run:
      container: build-env
    dependencies: [db]
"#,
    );

    let cfg = load_and_validate(file.path()).expect("config should load");

    assert_eq!(cfg.project_name, "my-app");

    let build_env = &cfg.containers["build-env"];
    assert_eq!(
        build_env.build_directory.as_deref(),
        Some(std::path::Path::new("dev-infrastructure/build-env"))
    );
    assert_eq!(build_env.command.as_deref(), Some("./gradlew test"));
    assert_eq!(build_env.working_directory.as_deref(), Some("/code"));
    assert_eq!(build_env.environment["GRADLE_OPTS"], "-Xmx512m");
    assert_eq!(build_env.volumes.len(), 1);
    assert_eq!(build_env.volumes[0].container, "/code");
    assert_eq!(build_env.ports[0].local, 8080);
    assert_eq!(build_env.ports[0].container, 80);

    let test = &cfg.tasks["test"];
    assert_eq!(test.description.as_deref(), Some("Run the test suite."));
    assert_eq!(test.run.container, "build-env");
    assert_eq!(test.dependencies, vec!["db".to_string()]);
}

#[test]
fn the_deprecated_start_key_unions_with_dependencies() {
    let file = write_config(
        r#"
project_name: p
containers:
  a:
    image: alpine
  b:
    image: alpine
  c:
    image: alpine
  svc:
    image: alpine
    dependencies: [a, b]
    start: [b, c]
tasks:
  t:
    run:
      container: svc
"#,
    );

    let cfg = load_and_validate(file.path()).expect("config should load");
    let deps = cfg.containers["svc"].effective_dependencies();

    assert_eq!(deps, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
}

#[test]
fn a_container_needs_exactly_one_image_source() {
    let neither = write_config(
        r#"
project_name: p
containers:
  svc: {}
tasks: {}
"#,
    );

    let err = load_and_validate(neither.path()).expect_err("should be rejected");
    assert!(matches!(
        err,
        ConfigError::InvalidImageSource { container } if container == "svc"
    ));

    let both = write_config(
        r#"
project_name: p
containers:
  svc:
    image: alpine
    build_directory: some/dir
tasks: {}
"#,
    );

    let err = load_and_validate(both.path()).expect_err("should be rejected");
    assert!(matches!(err, ConfigError::InvalidImageSource { .. }));
}

#[test]
fn unknown_references_are_rejected() {
    let file = write_config(
        r#"
project_name: p
containers:
  svc:
    image: alpine
    dependencies: [ghost]
tasks: {}
"#,
    );

    let err = load_and_validate(file.path()).expect_err("should be rejected");
    assert!(matches!(
        err,
        ConfigError::UnknownContainerDependency { container, dependency }
            if container == "svc" && dependency == "ghost"
    ));

    let file = write_config(
        r#"
project_name: p
containers:
  svc:
    image: alpine
tasks:
  t:
    run:
      container: missing
"#,
    );

    let err = load_and_validate(file.path()).expect_err("should be rejected");
    assert!(matches!(err, ConfigError::UnknownRunContainer { .. }));

    let file = write_config(
        r#"
project_name: p
containers:
  svc:
    image: alpine
tasks:
  t:
    run:
      container: svc
    prerequisites: [missing]
"#,
    );

    let err = load_and_validate(file.path()).expect_err("should be rejected");
    assert!(matches!(err, ConfigError::UnknownPrerequisite { .. }));
}

#[test]
fn a_self_dependency_is_rejected() {
    let file = write_config(
        r#"
project_name: p
containers:
  svc:
    image: alpine
    dependencies: [svc]
tasks: {}
"#,
    );

    let err = load_and_validate(file.path()).expect_err("should be rejected");
    assert!(matches!(
        err,
        ConfigError::SelfDependency { container } if container == "svc"
    ));
}

#[test]
fn a_missing_file_reports_its_path() {
    let err = load_from_path("does/not/exist.yml").expect_err("should fail");
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("does/not/exist.yml"));
}

#[test]
fn a_config_without_tasks_lists_nothing() {
    let file = write_config(
        r#"
project_name: p
"#,
    );

    let cfg = load_and_validate(file.path()).expect("config should load");
    assert_eq!(format_task_list(&cfg), "");
}

#[test]
fn the_task_list_is_sorted_and_shows_descriptions() {
    let file = write_config(
        r#"
project_name: p
containers:
  svc:
    image: alpine
tasks:
  zeta:
    run:
      container: svc
  alpha:
    description: First things first.
    run:
      container: svc
"#,
    );

    let cfg = load_and_validate(file.path()).expect("config should load");

    assert_eq!(
        format_task_list(&cfg),
        "- alpha: First things first.\n- zeta\n"
    );
}
