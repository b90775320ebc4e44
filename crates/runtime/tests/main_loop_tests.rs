use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

// Builds runtime_main and returns the path cargo reports for it.
fn get_binary_path() -> Result<PathBuf, String> {
    let output = Command::new(env!("CARGO"))
        .arg("build")
        .arg("--bin")
        .arg("runtime_main")
        .arg("--message-format=json")
        .output()
        .map_err(|e| format!("Failed to execute cargo build: {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "Cargo build failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    let reader = BufReader::new(output.stdout.as_slice());
    for line in reader.lines() {
        let line = line.map_err(|e| format!("Failed to read line: {e}"))?;
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&line) {
            if json["reason"] == "compiler-artifact" && json["target"]["name"] == "runtime_main" {
                if let Some(executable) = json["executable"].as_str() {
                    return Ok(PathBuf::from(executable));
                }
            }
        }
    }
    Err("Could not find executable path from cargo build output".to_string())
}

fn spawn_reader<R: Read + Send + 'static>(stream: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut captured = String::new();
        for line in BufReader::new(stream).lines().map_while(Result::ok) {
            captured.push_str(&line);
            captured.push('\n');
        }
        captured
    })
}

struct Run {
    status: ExitStatus,
    stdout: String,
}

fn run_headless(extra_args: &[&str], output: &PathBuf) -> Run {
    let binary_path = get_binary_path().unwrap_or_else(|e| panic!("Failed to get binary path: {e}"));

    let mut child = Command::new(binary_path)
        .args(["--width", "64", "--height", "48", "--partial-ms", "1", "--workers", "2"])
        .args(extra_args)
        .arg("--output")
        .arg(output)
        .env("RUST_LOG", "info")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn runtime_main process");

    let stdout = spawn_reader(child.stdout.take().expect("Failed to capture stdout"));
    let stderr = spawn_reader(child.stderr.take().expect("Failed to capture stderr"));

    let timeout = Duration::from_secs(60);
    let Some(status) = child
        .wait_timeout_secs(timeout)
        .expect("Failed to wait for runtime_main process")
    else {
        child.kill().expect("Failed to kill timed-out process");
        panic!("runtime_main process timed out after {timeout:?}");
    };

    let stdout = stdout.join().expect("Stdout reader thread panicked");
    let stderr = stderr.join().expect("Stderr reader thread panicked");
    eprintln!("--- runtime_main STDOUT ---\n{stdout}");
    eprintln!("--- runtime_main STDERR ---\n{stderr}");
    Run { status, stdout }
}

fn output_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("runtime_main_{}_{name}.png", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

#[test]
fn test_runtime_main_writes_a_frame() {
    let output = output_path("default");
    let run = run_headless(&[], &output);

    assert!(run.status.success(), "runtime_main exited with error: {:?}", run.status.code());
    assert!(run.stdout.contains("render finished"), "Expected render log not found in stdout.");
    assert!(run.stdout.contains("frame written"), "Expected output log not found in stdout.");

    let frame = image::open(&output).expect("output frame is a readable image").to_rgba8();
    assert_eq!(frame.dimensions(), (64, 48));
    assert!(frame.pixels().all(|p| p[3] == 255), "final frame has uncovered pixels");
    let _ = std::fs::remove_file(&output);
}

#[test]
fn test_runtime_main_smooth_camera() {
    let output = output_path("smooth");
    let run = run_headless(&["--smooth-camera", "--res-inv", "2"], &output);

    assert!(run.status.success(), "runtime_main exited with error: {:?}", run.status.code());
    assert!(run.stdout.contains("pan rendered"), "Expected pan log not found in stdout.");
    assert!(output.exists());
    let _ = std::fs::remove_file(&output);
}

// A helper trait and impl to use wait_timeout_secs (not in std Command on all Rust versions)
trait ChildExt {
    fn wait_timeout_secs(&mut self, duration: Duration) -> std::io::Result<Option<ExitStatus>>;
}

impl ChildExt for Child {
    fn wait_timeout_secs(&mut self, duration: Duration) -> std::io::Result<Option<ExitStatus>> {
        let start_time = Instant::now();
        loop {
            match self.try_wait()? {
                Some(status) => return Ok(Some(status)),
                None => {
                    if start_time.elapsed() > duration {
                        return Ok(None);
                    }
                    thread::sleep(Duration::from_millis(50));
                }
            }
        }
    }
}
