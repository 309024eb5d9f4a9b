use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Output};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

const STATUS_IDLE: &str = r#"{"running":false,"hasAgent":true,"episodes":12,"lastReward":210.5,"epsilon":0.05,"memorySize":500,"historyTail":[[10,190.0],[11,205.0],[12,210.5]]}"#;

struct MockTrainingServer {
    base_url: String,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockTrainingServer {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{}/api/v1", addr);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();

        let handle = thread::spawn(move || {
            listener.set_nonblocking(true).expect("nonblocking");
            while !stop_clone.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        let _ = handle_connection(&mut stream);
                    }
                    Err(_) => thread::sleep(Duration::from_millis(10)),
                }
            }
        });

        Self {
            base_url,
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for MockTrainingServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn handle_connection(stream: &mut TcpStream) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;

    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&raw);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.trim().eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if raw.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }

    let request = String::from_utf8_lossy(&raw).to_string();
    let mut parts = request.split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");
    let body = match (method, path) {
        ("GET", "/api/v1/health") => Some(r#"{"status":"ok"}"#),
        ("GET", "/api/v1/train/status") => Some(STATUS_IDLE),
        ("GET", "/api/v1/train/weights") => Some(r#"["dqn_final.pth"]"#),
        ("GET", "/api/v1/train/videos") => Some(r#"{"videos":[]}"#),
        ("POST", "/api/v1/train/start") => Some(r#"{"ok":true}"#),
        ("POST", "/api/v1/train/evaluate") => Some(r#"{"ok":false}"#),
        _ => None,
    };
    let response = match body {
        Some(body) => format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ),
        None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
    };
    stream.write_all(response.as_bytes())?;
    stream.flush()
}

fn run_console(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lander-console"))
        .args(args)
        .env_remove("LANDER_CONFIG")
        .env_remove("LANDER_API_BASE")
        .env_remove("LANDER_METRICS_ADDR")
        .env("LANDER_LOG", "warn")
        .output()
        .expect("run lander-console")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is json")
}

#[test]
fn headless_status_prints_snapshot_json() {
    let server = MockTrainingServer::start();
    let output = run_console(&[
        "--headless",
        "--mode",
        "status",
        "--api-base",
        &server.base_url,
    ]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let json = stdout_json(&output);
    assert_eq!(json["mode"], "status");
    assert_eq!(json["reward_trend"], serde_json::json!(20.5));
    assert_eq!(json["actions"]["start"], serde_json::json!(true));
    assert_eq!(json["actions"]["evaluate"], serde_json::json!(true));
    assert_eq!(json["weights_file"], "dqn_final.pth");
}

#[test]
fn headless_stop_while_idle_exits_with_gate_code() {
    let server = MockTrainingServer::start();
    let output = run_console(&[
        "--headless",
        "--mode",
        "stop",
        "--api-base",
        &server.base_url,
    ]);
    assert_eq!(output.status.code(), Some(2), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stderr).contains("command rejected"));
}

#[test]
fn headless_start_is_acknowledged() {
    let server = MockTrainingServer::start();
    let output = run_console(&[
        "--headless",
        "--mode",
        "start",
        "--api-base",
        &server.base_url,
    ]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert_eq!(stdout_json(&output)["message"], "Training started");
}

#[test]
fn headless_declined_evaluation_is_a_warning() {
    let server = MockTrainingServer::start();
    let output = run_console(&[
        "--headless",
        "--mode",
        "evaluate",
        "--weights",
        "dqn_final.pth",
        "--api-base",
        &server.base_url,
    ]);
    assert_eq!(output.status.code(), Some(3), "{output:?}");
    let json = stdout_json(&output);
    assert_eq!(json["status"], "warning");
    assert_eq!(json["message"], "No agent available to evaluate");
}

#[test]
fn headless_unreachable_service_exits_with_error() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let base = format!("http://{addr}/api/v1");
    let output = run_console(&[
        "--headless",
        "--mode",
        "health",
        "--api-base",
        &base,
        "--timeout-ms",
        "500",
    ]);
    assert_eq!(output.status.code(), Some(1), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn headless_requires_mode() {
    let output = run_console(&["--headless"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--mode is required"));
}

#[test]
fn invalid_api_base_is_rejected_before_running() {
    let output = run_console(&["--headless", "--mode", "health", "--api-base", "ftp://host"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("base_url"));
}
