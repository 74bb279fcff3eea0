//! Tests for command construction.

use super::*;
use crate::profile::Profile;

fn profile(yaml: &str) -> Profile {
    Profile::from_yaml(yaml).unwrap()
}

fn tokens(yaml: &str, path: &str) -> Vec<String> {
    build(&profile(yaml), path, &[]).unwrap().script
}

#[test]
fn env_single_and_list_forms_are_kept_in_order() {
    let p = profile("a:\n  env:\n    - A=5\n    - B=f e\nb:\n  env: HELLO='1'\n");

    assert_eq!(build(&p, "a", &[]).unwrap().env, vec!["A=5", "B=f e"]);
    assert_eq!(build(&p, "b", &[]).unwrap().env, vec!["HELLO='1'"]);
}

#[test]
fn env_mapping_form_and_overrides() {
    let p = profile("c:\n  env:\n    MVN: works\n");
    let overrides = vec![("X".to_string(), "a\"'b".to_string())];

    let env = build(&p, "c", &overrides).unwrap().env;

    assert_eq!(env, vec!["MVN=works", "X=a\"'b"]);
}

#[test]
fn env_includes_root_entries_first() {
    let p = profile("o:\n  env: A=123\nenv: ALPHA=909\n");
    assert_eq!(build(&p, "o", &[]).unwrap().env, vec!["ALPHA=909", "A=123"]);
}

#[test]
fn env_duplicates_are_not_merged() {
    let p = profile("env: A=1\nx:\n  env: [A=1, A=2]\n");
    let overrides = vec![("A".to_string(), "3".to_string())];
    assert_eq!(
        build(&p, "x", &overrides).unwrap().env,
        vec!["A=1", "A=1", "A=2", "A=3"]
    );
}

#[test]
fn empty_env_is_allowed() {
    let p = profile("ooo:\n  env:\n");
    assert!(build(&p, "ooo", &[]).unwrap().env.is_empty());
    let p = profile("ooo:\n  env: []\n");
    assert!(build(&p, "ooo", &[]).unwrap().env.is_empty());
}

#[test]
fn root_path_reads_root_env_once() {
    let p = profile("env: ONLY=1\nscript: ls\n");
    assert_eq!(build(&p, "", &[]).unwrap().env, vec!["ONLY=1"]);
}

#[test]
fn script_steps_are_separated() {
    assert_eq!(tokens("x:\n  script: mvn clean\n", "x"), vec!["mvn clean", ";"]);
    assert_eq!(
        tokens("y:\n  script:\n    - pw\n    - ls\n", "y"),
        vec!["pw", ";", "ls", ";"]
    );
}

#[test]
fn install_runs_before_script() {
    let yaml = "f:\n  script: hi\ninstall:\n  - one\n  - two\n";
    assert_eq!(tokens(yaml, "f"), vec!["one", ";", "two", ";", "hi", ";"]);
}

#[test]
fn uninstall_becomes_exit_trap() {
    let yaml = "uninstall:\n  - one\n  - two\nf:\n  script: hi\n";
    let command = build(&profile(yaml), "f", &[]).unwrap();

    assert_eq!(
        command.script,
        vec![
            "function", "clean_up()", "{", "one", ";", "two", ";", "}", ";", "trap", "clean_up",
            "EXIT", ";", "hi", ";"
        ]
    );
    assert_eq!(
        command.text(),
        "function clean_up() { one ; two ; } ; trap clean_up EXIT ; hi ;"
    );
}

#[test]
fn install_then_trap_then_script() {
    let yaml = "install: setup\nuninstall: teardown\nf:\n  script: hi\n";
    assert_eq!(
        build(&profile(yaml), "f", &[]).unwrap().text(),
        "setup ; function clean_up() { teardown ; } ; trap clean_up EXIT ; hi ;"
    );
}

#[test]
fn multi_line_scalar_is_split_per_line() {
    assert_eq!(
        tokens("script: \"How are you,\\ndude\"\n", ""),
        vec!["How are you,", ";", "dude", ";"]
    );
}

#[test]
fn blank_lines_are_dropped() {
    let yaml = "script: |\n  echo 1\n  echo 2\n\n\n  echo 3\n";
    assert_eq!(
        tokens(yaml, ""),
        vec!["echo 1", ";", "echo 2", ";", "echo 3", ";"]
    );
}

#[test]
fn comments_are_rewritten_in_steps() {
    let yaml = r##"
z:
  script:
    - echo "first"
    - '# some comment'
    - echo "# some comment" more
    - echo '# some comment' more
    - 'echo "second" # some comment'
    - echo "third" \# some comment
    - echo "last"
"##;
    assert_eq!(
        tokens(yaml, "z"),
        vec![
            "echo \"first\"",
            ";",
            "`# some comment`",
            ";",
            "echo \"# some comment\" more",
            ";",
            "echo '# some comment' more",
            ";",
            "echo \"second\" `# some comment`",
            ";",
            "echo \"third\" \\# some comment",
            ";",
            "echo \"last\"",
            ";",
        ]
    );
}

#[test]
fn missing_section_yields_empty_script() {
    let command = build(&Profile::empty(), "deploy", &[]).unwrap();
    assert!(command.script.is_empty());
    assert!(command.env.is_empty());
    assert_eq!(command.image, crate::profile::DEFAULT_IMAGE);
}

#[test]
fn nested_structures_are_rejected() {
    let p = profile("x:\n  script:\n    - [a, b]\n");
    assert!(build(&p, "x", &[]).is_err());
}

#[test]
fn quoted_rendering_wraps_tokens() {
    let command = build(&profile("script: echo hi\n"), "", &[]).unwrap();
    assert_eq!(command.quoted(), "( 'echo hi' ';' )");
}
