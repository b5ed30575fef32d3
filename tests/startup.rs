use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use poem::listener::Acceptor;

use kube_demo::api::name::NAMES;
use kube_demo::server::{self, ServiceKind};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(2);

// Start a service on a free local port and return its address.
async fn start(service: ServiceKind) -> std::net::SocketAddr {
    let acceptor = server::bind("127.0.0.1:0").await.unwrap();
    let addr = *acceptor.local_addr()[0].as_socket_addr().unwrap();
    let app = server::build_app(service, service.default_title());
    tokio::spawn(server::serve(acceptor, service, app));
    addr
}

// Issue a bare HTTP/1.1 request and return the raw response.
async fn request(addr: std::net::SocketAddr, method: &str) -> String {
    let mut stream = timeout(STARTUP_TIMEOUT, TcpStream::connect(addr))
        .await
        .expect("port not connectable in time")
        .unwrap();
    let req = format!("{} / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", method);
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    timeout(STARTUP_TIMEOUT, stream.read_to_end(&mut buf))
        .await
        .expect("no response in time")
        .unwrap();
    String::from_utf8(buf).unwrap()
}

fn body(resp: &str) -> &str {
    resp.split("\r\n\r\n").nth(1).unwrap_or_default()
}

#[tokio::test]
async fn greeting_service_answers_on_free_port() {
    let addr = start(ServiceKind::Greeting).await;
    let resp = request(addr, "GET").await;
    assert!(resp.starts_with("HTTP/1.1 200"), "{}", resp);
    assert!(body(&resp).starts_with("Hello, there. My name is "));
}

#[tokio::test]
async fn name_service_answers_on_free_port() {
    let addr = start(ServiceKind::Name).await;
    let resp = request(addr, "GET").await;
    assert!(resp.starts_with("HTTP/1.1 200"), "{}", resp);
    assert!(NAMES.contains(&body(&resp)), "{}", resp);
}

#[tokio::test]
async fn post_is_not_successful() {
    let addr = start(ServiceKind::Name).await;
    let resp = request(addr, "POST").await;
    assert!(!resp.starts_with("HTTP/1.1 2"), "{}", resp);
}
