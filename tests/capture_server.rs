use std::{
    io::{Read, Write},
    net::TcpStream,
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use swfcap::{CaptureConfig, FixtureError, FixtureResult, RendererInvoker, capture};

/// Sends one raw HTTP exchange and returns the full response text.
fn http_exchange(port: u16, request: &[u8]) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(("127.0.0.1", port))?;
    stream.write_all(request)?;
    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    Ok(response)
}

fn post(path_and_query: &str, body: &[u8]) -> Vec<u8> {
    let mut request = format!(
        "POST {path_and_query} HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(body);
    request
}

fn get(path: &str) -> Vec<u8> {
    format!("GET {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n").into_bytes()
}

fn status_line(response: &str) -> String {
    response.lines().next().unwrap_or_default().to_string()
}

/// The renderer stub runs detached; give it a moment to finish recording
/// its exchanges before asserting on them.
fn wait_for_exchanges(observed: &Arc<Mutex<Vec<String>>>, count: usize) {
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while observed.lock().unwrap().len() < count && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Plays a fixed list of HTTP exchanges against the capture server, in
/// order, recording each response's status line.
struct ScriptedInvoker {
    port: u16,
    exchanges: Vec<Vec<u8>>,
    observed: Arc<Mutex<Vec<String>>>,
    fail_after: bool,
}

impl RendererInvoker for ScriptedInvoker {
    fn invoke(&self, _movie: &Path, _cwd: &Path, _timeout: Duration) -> FixtureResult<()> {
        for exchange in &self.exchanges {
            let status = match http_exchange(self.port, exchange) {
                Ok(response) => status_line(&response),
                Err(e) => format!("io error: {e}"),
            };
            self.observed.lock().unwrap().push(status);
        }
        if self.fail_after {
            return Err(FixtureError::renderer("scripted renderer failure"));
        }
        Ok(())
    }
}

fn config(port: u16) -> CaptureConfig {
    CaptureConfig {
        port,
        renderer_timeout: Duration::from_secs(5),
        exit_grace: Duration::from_millis(500),
    }
}

#[test]
fn capture_resolves_on_valid_post_and_closes_listener() {
    let port = 3101;
    // 2x2 ARGB body: per-pixel [A, R, G, B].
    let mut body = Vec::new();
    for i in 0..4u8 {
        body.extend_from_slice(&[0xF0 + i, 0x10 + i, 0x20 + i, 0x30 + i]);
    }

    let observed = Arc::new(Mutex::new(Vec::new()));
    let invoker: Arc<dyn RendererInvoker> = Arc::new(ScriptedInvoker {
        port,
        exchanges: vec![post("/ok?width=2&height=2", &body)],
        observed: Arc::clone(&observed),
        fail_after: false,
    });

    let buffer = capture(Path::new("movie.swf"), Path::new("."), invoker, &config(port)).unwrap();

    assert_eq!((buffer.width, buffer.height), (2, 2));
    assert_eq!(buffer.data.len(), 16);
    for i in 0..4usize {
        let px = &buffer.data[i * 4..i * 4 + 4];
        let i = i as u8;
        assert_eq!(px, &[0x10 + i, 0x20 + i, 0x30 + i, 0xF0 + i]);
    }
    wait_for_exchanges(&observed, 1);
    assert_eq!(observed.lock().unwrap().as_slice(), ["HTTP/1.1 200 OK"]);

    // The listener is released on completion: a second POST must fail.
    assert!(http_exchange(port, &post("/ok?width=2&height=2", &body)).is_err());
}

#[test]
fn invalid_posts_are_rejected_without_ending_the_attempt() {
    let port = 3102;
    let good_body = [0xAA, 0xBB, 0xCC, 0xDD];

    let observed = Arc::new(Mutex::new(Vec::new()));
    let invoker: Arc<dyn RendererInvoker> = Arc::new(ScriptedInvoker {
        port,
        exchanges: vec![
            post("/A?width=1&height=1", &good_body),
            post("/ok?width=0&height=1", &good_body),
            post("/ok?width=1&height=1", &[0u8; 3]),
            get("/crossdomain.xml"),
            get("/nope"),
            post("/ok?width=1&height=1", &good_body),
        ],
        observed: Arc::clone(&observed),
        fail_after: false,
    });

    let buffer = capture(Path::new("movie.swf"), Path::new("."), invoker, &config(port)).unwrap();
    assert_eq!(buffer.data, vec![0xBB, 0xCC, 0xDD, 0xAA]);

    wait_for_exchanges(&observed, 6);
    let statuses = observed.lock().unwrap();
    assert_eq!(
        statuses.as_slice(),
        [
            "HTTP/1.1 500 Internal Server Error",
            "HTTP/1.1 500 Internal Server Error",
            "HTTP/1.1 500 Internal Server Error",
            "HTTP/1.1 200 OK",
            "HTTP/1.1 404 Not Found",
            "HTTP/1.1 200 OK",
        ]
    );
}

#[test]
fn crossdomain_policy_is_served_verbatim() {
    let port = 3103;
    let observed = Arc::new(Mutex::new(Vec::new()));
    let invoker: Arc<dyn RendererInvoker> = Arc::new(ScriptedInvoker {
        port,
        exchanges: vec![get("/crossdomain.xml"), post("/ok?width=1&height=1", &[1, 2, 3, 4])],
        observed: Arc::clone(&observed),
        fail_after: false,
    });

    capture(Path::new("movie.swf"), Path::new("."), invoker, &config(port)).unwrap();

    // Re-fetch is not possible after completion, so inspect the recorded
    // exchange: the policy route must have answered 200 before the POST.
    wait_for_exchanges(&observed, 2);
    assert_eq!(observed.lock().unwrap()[0], "HTTP/1.1 200 OK");
}

#[test]
fn renderer_failure_is_terminal() {
    let port = 3104;
    let invoker: Arc<dyn RendererInvoker> = Arc::new(ScriptedInvoker {
        port,
        exchanges: vec![],
        observed: Arc::new(Mutex::new(Vec::new())),
        fail_after: true,
    });

    let err = capture(Path::new("movie.swf"), Path::new("."), invoker, &config(port)).unwrap_err();
    assert!(matches!(err, FixtureError::Renderer(_)), "{err}");

    // Terminal failure also releases the listener.
    assert!(http_exchange(port, &get("/crossdomain.xml")).is_err());
}

#[test]
fn benign_exit_without_capture_fails_after_grace() {
    let port = 3105;
    let invoker: Arc<dyn RendererInvoker> = Arc::new(ScriptedInvoker {
        port,
        exchanges: vec![],
        observed: Arc::new(Mutex::new(Vec::new())),
        fail_after: false,
    });

    let err = capture(Path::new("movie.swf"), Path::new("."), invoker, &config(port)).unwrap_err();
    assert!(matches!(err, FixtureError::RendererExited), "{err}");
}
