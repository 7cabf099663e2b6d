use std::path::Path;
use std::process::Output;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use tokio::process::Command;

/// Build an unsigned JWT whose payload carries `exp`.
pub fn jwt_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": "alice", "exp": exp }).to_string());
    format!("{}.{}.sig", header, payload)
}

pub fn live_jwt() -> String {
    jwt_with_exp(chrono::Utc::now().timestamp() + 3600)
}

pub fn expired_jwt() -> String {
    jwt_with_exp(chrono::Utc::now().timestamp() - 60)
}

/// Run the CLI binary with an isolated data directory against `base_url`.
pub async fn run_cli(args: &[&str], data_dir: &Path, base_url: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_spendauth"))
        .args(args)
        .arg("--data-dir")
        .arg(data_dir)
        .env("SPENDAUTH_BASE_URL", base_url)
        .env("NO_COLOR", "1")
        .env("CLICOLOR", "0")
        .env_remove("RUST_LOG")
        .output()
        .await
        .expect("Failed to execute CLI")
}

/// Run the CLI and expect success.
pub async fn run_cli_success(args: &[&str], data_dir: &Path, base_url: &str) -> String {
    let output = run_cli(args, data_dir, base_url).await;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run the CLI and expect failure, returning stderr.
pub async fn run_cli_failure(args: &[&str], data_dir: &Path, base_url: &str) -> String {
    let output = run_cli(args, data_dir, base_url).await;
    if output.status.success() {
        panic!("CLI command should have failed: {:?}", args);
    }
    String::from_utf8_lossy(&output.stderr).to_string()
}
