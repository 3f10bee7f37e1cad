mod common;

use std::process::Command;

fn temp_db_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("stride-setup-{}.db", uuid::Uuid::new_v4()))
}

#[tokio::test]
async fn promotes_existing_account() {
    let path = temp_db_path();
    let pool = stride_server::db::init_pool(path.to_str().unwrap()).await.unwrap();
    let (user_id, _) = common::create_test_user(&pool, "coach@test.com", "coach", "pass1234").await;
    pool.close().await;

    let output = Command::new(env!("CARGO_BIN_EXE_stride-setup"))
        .args(["--database", path.to_str().unwrap(), "--admin-email", "Coach@Test.com"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let pool = stride_server::db::init_pool(path.to_str().unwrap()).await.unwrap();
    let is_admin: bool = sqlx::query_scalar(r#"SELECT is_super_admin FROM "user" WHERE id = ?"#)
        .bind(&user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(is_admin);
    pool.close().await;
    let _ = std::fs::remove_file(&path);
}

#[test]
fn unknown_account_exits_with_failure() {
    let path = temp_db_path();

    let output = Command::new(env!("CARGO_BIN_EXE_stride-setup"))
        .args(["--database", path.to_str().unwrap(), "--admin-email", "ghost@test.com"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ghost@test.com"), "stderr: {}", stderr);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_arguments_fail() {
    let output = Command::new(env!("CARGO_BIN_EXE_stride-setup"))
        .env_remove("DATABASE_PATH")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn help_states_account_must_exist() {
    let output = Command::new(env!("CARGO_BIN_EXE_stride-setup"))
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    assert!(help.contains("existing account"), "help: {}", help);
}
