//! Integration test: drive the shell end to end against a temp data dir, the local
//! catalog, and the stdio line protocol. No network or home directory is touched.

use serde_json::json;
use skillshell::catalog::{LocalCatalog, SkillEngine};
use skillshell::dashboard::{Dashboard, DashboardStore};
use skillshell::router::{CatalogRequest, Shell};
use skillshell::{ErrorKind, ShellError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

struct TempRoot(PathBuf);

impl Drop for TempRoot {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn temp_root() -> TempRoot {
    let dir = std::env::temp_dir().join(format!("skillshell-shell-test-{}", uuid::Uuid::new_v4()));
    let skill = dir.join("skills").join("git-flow");
    std::fs::create_dir_all(&skill).expect("create skill dir");
    std::fs::write(
        skill.join("SKILL.md"),
        "---\nname: git-flow\ndescription: Branching workflow\ndomain: dev\n---\n\n# Git flow\n",
    )
    .expect("write SKILL.md");
    TempRoot(dir)
}

fn dashboard(root: &TempRoot) -> Arc<Dashboard> {
    Arc::new(Dashboard::new(DashboardStore::in_dir(&root.0.join("data"))))
}

fn local_shell(root: &TempRoot) -> Shell {
    let engine = LocalCatalog::new(root.0.join("skills"), Vec::new(), &root.0.join("data"));
    Shell::new(Arc::new(engine), dashboard(root))
}

struct PanickingEngine;

impl SkillEngine for PanickingEngine {
    fn execute(&self, _request: &CatalogRequest) -> skillshell::error::Result<String> {
        panic!("engine blew up");
    }
}

struct SlowEngine;

impl SkillEngine for SlowEngine {
    fn execute(&self, _request: &CatalogRequest) -> skillshell::error::Result<String> {
        std::thread::sleep(Duration::from_millis(300));
        Ok("late".to_string())
    }
}

struct FailingEngine;

impl SkillEngine for FailingEngine {
    fn execute(&self, _request: &CatalogRequest) -> skillshell::error::Result<String> {
        Err(ShellError::Engine("catalog offline".to_string()))
    }
}

#[tokio::test]
async fn nav_jump_and_exec_track_position() {
    let root = temp_root();
    let shell = local_shell(&root);

    let nav = shell.dispatch("nav", None).await;
    assert!(nav.success);
    let tree = nav.rendered_output.unwrap();
    assert!(tree.contains("0.1.9 | equip"));
    assert!(tree.ends_with("Current position: 0 (skill_manager)"));

    let jump = shell.dispatch("jump equip", None).await;
    assert!(jump.success);
    assert!(jump.text().starts_with("0.1.9 | equip"));
    assert_eq!(shell.position(), "0.1.9");

    let exec = shell.dispatch(r#"exec {"name": "git-flow"}"#, None).await;
    assert_eq!(exec.text(), "Equipped skill 'git-flow'");

    let recents = shell.dispatch("recently_equipped.exec", None).await;
    assert!(recents.text().contains("  - git-flow ("), "{}", recents.text());
    assert_eq!(shell.position(), "0.2.8");
}

#[tokio::test]
async fn unknown_node_is_a_structured_failure() {
    let root = temp_root();
    let shell = local_shell(&root);

    let res = shell.dispatch(r#"no_such_op.exec {"name": "x"}"#, None).await;
    assert!(!res.success);
    assert_eq!(res.kind, Some(ErrorKind::NotFound));
    assert!(res.text().starts_with("Error: unknown node 'no_such_op'"));
    assert_eq!(shell.position(), "0");

    let res = shell.dispatch("jump 0.9.9", None).await;
    assert_eq!(res.kind, Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn unknown_skill_fails_without_raising() {
    let root = temp_root();
    let shell = local_shell(&root);

    assert!(shell.dispatch("jump equip", None).await.success);
    let res = shell.dispatch(r#"equip.exec {"name": "x"}"#, None).await;
    assert!(!res.success);
    assert_eq!(res.kind, Some(ErrorKind::NotFound));
    assert_eq!(res.command, r#"equip.exec {"name": "x"}"#);

    let recents = shell.dispatch("recently_equipped.exec", None).await;
    assert_eq!(recents.text(), "No recently equipped items tracked.");
}

#[tokio::test]
async fn missing_arguments_are_named() {
    let root = temp_root();
    let shell = local_shell(&root);

    let res = shell.dispatch(r#"create_issue.exec {"title": "Bug"}"#, None).await;
    assert_eq!(res.kind, Some(ErrorKind::Validation));
    assert_eq!(
        res.error.as_deref(),
        Some("create_issue is missing required argument(s): body")
    );
    assert!(!root.0.join("data").join("skill_dashboard.json").exists());
}

#[tokio::test]
async fn executing_a_menu_is_rejected() {
    let root = temp_root();
    let shell = local_shell(&root);

    let res = shell.dispatch("exec", None).await;
    assert_eq!(res.kind, Some(ErrorKind::Validation));
    let res = shell.dispatch("0.2.exec", None).await;
    assert_eq!(res.kind, Some(ErrorKind::Validation));
    assert_eq!(shell.position(), "0.2");
}

#[tokio::test]
async fn transport_args_merge_under_inline_args() {
    let root = temp_root();
    let shell = local_shell(&root);

    let res = shell
        .dispatch(
            r#"fav_skills_add.exec {"category": "core"}"#,
            Some(json!({"skill_name": "alpha", "category": "ignored"})),
        )
        .await;
    assert_eq!(res.text(), "Added 'alpha' to favorites under 'core'");

    let res = shell.dispatch("fav_skills_add.exec", Some(json!(["alpha"]))).await;
    assert_eq!(res.kind, Some(ErrorKind::Validation));
}

#[tokio::test]
async fn dashboard_scenarios_through_the_router() {
    let root = temp_root();
    let shell = local_shell(&root);

    shell
        .dispatch(r#"fav_skills_add.exec {"skill_name": "alpha", "category": "core"}"#, None)
        .await;
    let list = shell.dispatch("fav_skills_list.exec", None).await.text();
    assert!(list.contains("[core]\n  - alpha"), "{}", list);

    let res = shell
        .dispatch(r#"fav_personas_remove.exec {"persona_name": "ghost"}"#, None)
        .await;
    assert_eq!(res.text(), "'ghost' not found");

    let res = shell
        .dispatch(
            r#"create_issue.exec {"title": "Bug A", "body": "desc", "tags": "urgent,ui"}"#,
            None,
        )
        .await;
    assert!(res.text().contains("issue_1"));
    let all = shell.dispatch("review_issues.exec", None).await.text();
    assert!(all.contains("[issue_1] Bug A ("), "{}", all);
    let one = shell
        .dispatch(r#"review_issues.exec {"issue_id": "issue_1"}"#, None)
        .await
        .text();
    assert!(one.contains("Tags: urgent, ui"), "{}", one);
}

#[tokio::test]
async fn creations_are_recorded_as_recently_made() {
    let root = temp_root();
    let shell = local_shell(&root);

    let res = shell
        .dispatch(
            r#"create_skill.exec {"name": "tax-prep", "domain": "finance", "content": "Gather receipts", "description": "Prepare taxes"}"#,
            None,
        )
        .await;
    assert!(res.success, "{:?}", res);
    let made = shell.dispatch(r#"recently_made.exec {"limit": 5}"#, None).await.text();
    assert!(made.contains("  - tax-prep ("), "{}", made);

    let get = shell.dispatch(r#"get_skill.exec {"name": "tax-prep"}"#, None).await;
    assert!(get.text().contains("Gather receipts"));
}

#[tokio::test]
async fn engine_panic_is_an_internal_failure() {
    let root = temp_root();
    let shell = Shell::new(Arc::new(PanickingEngine), dashboard(&root));

    let res = shell.dispatch("list_skills.exec", None).await;
    assert!(!res.success);
    assert_eq!(res.kind, Some(ErrorKind::Internal));
    assert!(!res.error.unwrap_or_default().contains("blew up"));

    // The shell keeps serving after a panic.
    assert!(shell.dispatch("fav_skills_list.exec", None).await.success);
}

#[tokio::test]
async fn slow_operations_time_out() {
    let root = temp_root();
    let shell = Shell::new(Arc::new(SlowEngine), dashboard(&root))
        .with_timeout(Duration::from_millis(50));

    let res = shell.dispatch("list_skills.exec", None).await;
    assert_eq!(res.kind, Some(ErrorKind::Timeout));
    assert_eq!(res.error.as_deref(), Some("operation timed out after 50ms"));
}

#[tokio::test]
async fn engine_failures_skip_recency() {
    let root = temp_root();
    let shell = Shell::new(Arc::new(FailingEngine), dashboard(&root));

    let res = shell.dispatch(r#"equip.exec {"name": "git-flow"}"#, None).await;
    assert_eq!(res.kind, Some(ErrorKind::Engine));
    assert_eq!(res.text(), "Error: catalog offline");
    assert_eq!(
        shell.dashboard().recently_equipped(10).unwrap(),
        "No recently equipped items tracked."
    );
}

#[tokio::test]
async fn corrupt_dashboard_is_reported_and_left_alone() {
    let root = temp_root();
    let shell = local_shell(&root);
    let path = root.0.join("data").join("skill_dashboard.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"not json").unwrap();

    let res = shell
        .dispatch(r#"fav_skills_add.exec {"skill_name": "alpha"}"#, None)
        .await;
    assert_eq!(res.kind, Some(ErrorKind::CorruptState));
    assert_eq!(std::fs::read(&path).unwrap(), b"not json");

    // Equip still succeeds; only the recency side channel fails.
    let res = shell.dispatch(r#"equip.exec {"name": "git-flow"}"#, None).await;
    assert!(res.success, "{:?}", res);
}

#[tokio::test]
async fn stdio_protocol_answers_each_frame() {
    let root = temp_root();
    let shell = local_shell(&root);

    let mut input: Vec<u8> = concat!(
        r#"{"type":"req","id":"1","method":"run_conversation_shell","params":{"command":"jump equip"}}"#,
        "\n\n",
        r#"{"type":"req","id":"2","method":"run_conversation_shell","params":{"command":"exec","args":{"name":"git-flow"}}}"#,
        "\n",
        r#"{"type":"req","id":"3","method":"bogus","params":{}}"#,
        "\n",
        "garbage\n",
        r#"{"type":"req","id":"4","method":"describe"}"#,
        "\n",
    )
    .as_bytes()
    .to_vec();
    input.extend_from_slice(b"\xff\xfe garbage\n");
    input.extend_from_slice(
        br#"{"type":"req","id":"5","method":"run_conversation_shell","params":{"command":"nav"}}"#,
    );
    input.push(b'\n');
    let mut out: Vec<u8> = Vec::new();
    skillshell::transport::serve(&shell, tokio::io::BufReader::new(input.as_slice()), &mut out)
        .await
        .expect("serve");

    let frames: Vec<serde_json::Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(frames.len(), 7);

    assert_eq!(frames[0]["id"], "1");
    assert_eq!(frames[0]["ok"], true);
    assert_eq!(frames[0]["payload"]["success"], true);

    assert_eq!(frames[1]["payload"]["rendered_output"], "Equipped skill 'git-flow'");

    assert_eq!(frames[2]["ok"], false);
    assert_eq!(frames[2]["error"], "unknown method: bogus");

    assert_eq!(frames[3]["ok"], false);
    assert_eq!(frames[3]["id"], "");

    assert_eq!(frames[4]["ok"], true);
    assert!(frames[4]["payload"]["description"]
        .as_str()
        .unwrap()
        .contains("0.2.10 | review_issues"));

    // A non-UTF-8 line gets an error frame and later frames are still answered.
    assert_eq!(frames[5]["ok"], false);
    assert_eq!(frames[5]["id"], "");
    assert!(frames[5]["error"]
        .as_str()
        .unwrap()
        .starts_with("invalid frame: "));
    assert_eq!(frames[6]["id"], "5");
    assert_eq!(frames[6]["ok"], true);
    assert_eq!(frames[6]["payload"]["success"], true);
}
