use std::{
    path::Path,
    sync::{Arc, mpsc},
    thread,
    time::{Duration, Instant},
};

use tiny_http::{Method, Response, Server, StatusCode};

use crate::{
    error::{FixtureError, FixtureResult},
    invoke::RendererInvoker,
    pixel::PixelBuffer,
    request::CaptureRequest,
};

/// Policy document served at `/crossdomain.xml`. The embedded renderer's
/// network stack fetches this before it permits the capture POST.
pub const CROSSDOMAIN_XML: &str = r#"<?xml version="1.0"?>
<!DOCTYPE cross-domain-policy SYSTEM "http://www.adobe.com/xml/dtds/cross-domain-policy.dtd">
<cross-domain-policy>
  <allow-access-from domain="*" />
  <site-control permitted-cross-domain-policies="all" />
</cross-domain-policy>
"#;

#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Local port the bootstrap program posts back to.
    pub port: u16,
    /// Budget for the whole renderer invocation.
    pub renderer_timeout: Duration,
    /// How long to keep listening after a benign renderer exit, in case a
    /// posted capture is still in flight.
    pub exit_grace: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            renderer_timeout: Duration::from_secs(20),
            exit_grace: Duration::from_secs(2),
        }
    }
}

const RECV_POLL: Duration = Duration::from_millis(50);

/// Runs one capture attempt: bind the listener, launch the renderer, await
/// exactly one valid pixel-transfer POST.
///
/// The listener goes through `WaitingForLaunch -> Listening ->
/// {Completed, Failed}`: the renderer is only launched once the socket is
/// bound and accepting, so its callback can never race the bind. The bound
/// socket is released exactly once on every terminal path. Invalid POSTs
/// are answered with 500 and do not terminate the attempt; only a valid
/// capture or a renderer failure/timeout does.
#[tracing::instrument(skip_all, fields(movie = %movie_path.display()))]
pub fn capture(
    movie_path: &Path,
    working_dir: &Path,
    invoker: Arc<dyn RendererInvoker>,
    config: &CaptureConfig,
) -> FixtureResult<PixelBuffer> {
    let server = Server::http(("127.0.0.1", config.port))
        .map_err(|e| FixtureError::server(format!("bind 127.0.0.1:{}: {e}", config.port)))?;
    tracing::debug!(port = config.port, "capture server listening");

    // Detached on purpose: a successful capture returns immediately while
    // the player keeps running until the invoker's timeout reaps it.
    let (done_tx, done_rx) = mpsc::channel();
    {
        let invoker = Arc::clone(&invoker);
        let movie = movie_path.to_path_buf();
        let cwd = working_dir.to_path_buf();
        let timeout = config.renderer_timeout;
        thread::spawn(move || {
            let _ = done_tx.send(invoker.invoke(&movie, &cwd, timeout));
        });
    }

    let result = run_listener(&server, &done_rx, config.exit_grace);
    drop(server);
    match &result {
        Ok(buffer) => tracing::info!(
            width = buffer.width,
            height = buffer.height,
            "capture completed"
        ),
        Err(e) => tracing::warn!(error = %e, "capture failed"),
    }
    result
}

enum Handled {
    Completed(PixelBuffer),
    Continue,
}

fn run_listener(
    server: &Server,
    done_rx: &mpsc::Receiver<FixtureResult<()>>,
    exit_grace: Duration,
) -> FixtureResult<PixelBuffer> {
    let mut renderer_done = false;
    let mut grace_deadline: Option<Instant> = None;

    loop {
        let request = server
            .recv_timeout(RECV_POLL)
            .map_err(|e| FixtureError::server(format!("accept capture request: {e}")))?;
        if let Some(request) = request {
            if let Handled::Completed(buffer) = handle_request(request) {
                return Ok(buffer);
            }
        }

        match done_rx.try_recv() {
            Ok(Ok(())) => {
                renderer_done = true;
                if grace_deadline.is_none() {
                    tracing::debug!("renderer exited without capture, starting grace window");
                    grace_deadline = Some(Instant::now() + exit_grace);
                }
            }
            Ok(Err(e)) => return Err(e),
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                if !renderer_done {
                    return Err(FixtureError::renderer(
                        "renderer thread terminated without reporting a result",
                    ));
                }
            }
        }

        if let Some(deadline) = grace_deadline
            && Instant::now() >= deadline
        {
            return Err(FixtureError::RendererExited);
        }
    }
}

fn handle_request(mut request: tiny_http::Request) -> Handled {
    let method = request.method().clone();
    let url = request.url().to_string();

    match method {
        Method::Get if url == "/crossdomain.xml" => {
            let mut response = Response::from_string(CROSSDOMAIN_XML);
            if let Ok(header) = "Content-Type: application/xml".parse::<tiny_http::Header>() {
                response.add_header(header);
            }
            if let Err(e) = request.respond(response) {
                tracing::warn!(error = %e, "failed to respond to policy request");
            }
            Handled::Continue
        }
        Method::Post => {
            let mut body = Vec::new();
            if let Err(e) = request.as_reader().read_to_end(&mut body) {
                tracing::warn!(error = %e, url = %url, "failed to read capture body");
                let _ = request.respond(Response::empty(StatusCode(500)));
                return Handled::Continue;
            }

            match CaptureRequest::from_url(&url, body).decode() {
                Ok(buffer) => {
                    let _ = request.respond(Response::empty(StatusCode(200)));
                    Handled::Completed(buffer)
                }
                Err(e) => {
                    if e.is_request_rejection() {
                        tracing::warn!(error = %e, url = %url, "rejected capture request");
                    } else {
                        tracing::error!(error = %e, url = %url, "capture request failed");
                    }
                    let _ = request.respond(Response::empty(StatusCode(500)));
                    Handled::Continue
                }
            }
        }
        _ => {
            let _ = request.respond(Response::empty(StatusCode(404)));
            Handled::Continue
        }
    }
}
