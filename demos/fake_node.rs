//! demos/fake_node.rs
//! A stand-in node endpoint for poking at the agent by hand.
//! Run: cargo run --example fake_node -- <port>
//!
//! Env knobs: FLIP_SECS (toggle health every N seconds, 0 = stay healthy),
//! DELAY_MS (fixed response latency for timeout experiments).

use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::sleep;

#[derive(Clone)]
struct NodeState {
    req_counter: Arc<AtomicU64>,
    healthy_flag: Arc<AtomicBool>,
    delay_ms: u64,
}

async fn handle(req: Request<Body>, state: NodeState) -> Result<Response<Body>, Infallible> {
    let n = state.req_counter.fetch_add(1, Ordering::SeqCst) + 1;
    let path = req.uri().path().to_owned();

    if state.delay_ms > 0 {
        sleep(Duration::from_millis(state.delay_ms)).await;
    }

    if path == "/healthz" {
        if state.healthy_flag.load(Ordering::SeqCst) {
            return Ok(Response::new(Body::from("OK")));
        } else {
            return Ok(Response::builder()
                .status(StatusCode::SERVICE_UNAVAILABLE)
                .body(Body::from("Unhealthy"))
                .unwrap());
        }
    }

    let body = format!(r#"{{"req":{},"path":"{}"}}"#, n, path);
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port: u16 = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "10250".into())
        .parse()?;

    let flip_secs: u64 = std::env::var("FLIP_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let delay_ms: u64 = std::env::var("DELAY_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let state = NodeState {
        req_counter: Arc::new(AtomicU64::new(0)),
        healthy_flag: Arc::new(AtomicBool::new(true)),
        delay_ms,
    };

    if flip_secs > 0 {
        let st = state.clone();
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(flip_secs)).await;
                let cur = st.healthy_flag.load(Ordering::SeqCst);
                st.healthy_flag.store(!cur, Ordering::SeqCst);
                println!(
                    "[fake-node] Health flipped -> {}",
                    if !cur { "healthy" } else { "unhealthy" }
                );
            }
        });
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let make_svc = make_service_fn(move |_conn| {
        let st = state.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle(req, st.clone()))) }
    });

    println!(
        "Fake node on http://{}  [delay={}ms flip={}s]",
        addr, delay_ms, flip_secs
    );

    Server::bind(&addr).serve(make_svc).await?;
    Ok(())
}
