use std::net::SocketAddr;
use std::time::Duration;

use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve_app() -> SocketAddr {
    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .expect("connect db");
    parallelization_issues::db::migrations::Migrator::up(&db, None)
        .await
        .expect("migrate");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let app = parallelization_issues::web::app(db);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn visit(addr: SocketAddr, path: &str) {
    let response = reqwest::get(format!("http://{addr}{path}"))
        .await
        .expect("page request");
    assert!(response.status().is_success(), "{path}: {}", response.status());
}

async fn open(addr: SocketAddr, path: &str) -> Socket {
    let (socket, _) = connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("websocket handshake");
    socket
}

async fn next_message(socket: &mut Socket) -> Message {
    tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("socket ended")
        .expect("socket error")
}

#[tokio::test]
async fn test_socket_streams_its_own_scenario() {
    let addr = serve_app().await;

    visit(addr, "/simulate-problems/deadlock-page").await;
    let mut deadlock = open(addr, "/ws/problems/deadlock").await;
    let first = next_message(&mut deadlock).await;
    assert_eq!(
        first.to_text().expect("text frame"),
        "Deadlock simulation started..."
    );

    visit(addr, "/simulate-solutions/livelock-page").await;
    let mut livelock = open(addr, "/ws/solutions/livelock").await;
    let first = next_message(&mut livelock).await;
    assert_eq!(
        first.to_text().expect("text frame"),
        "Livelock solutions simulation started..."
    );

    let mut seen = Vec::new();
    deadlock
        .send(Message::Ping("are you there".into()))
        .await
        .expect("send ping");
    loop {
        match next_message(&mut deadlock).await {
            Message::Pong(payload) => {
                assert_eq!(&payload[..], b"are you there");
                break;
            }
            Message::Text(text) => seen.push(text.as_str().to_owned()),
            other => panic!("unexpected frame before pong: {other:?}"),
        }
    }

    visit(addr, "/simulate-problems/stop").await;
    let close = loop {
        match next_message(&mut deadlock).await {
            Message::Close(frame) => break frame,
            Message::Text(text) => seen.push(text.as_str().to_owned()),
            _ => {}
        }
    };
    let frame = close.expect("close frame carries a code");
    assert_eq!(u16::from(frame.code), 1000);

    assert!(seen.contains(&"Simulation stopped.".to_string()), "{seen:?}");
    assert!(
        seen.iter().all(|line| !line.to_lowercase().contains("livelock")),
        "another endpoint leaked in: {seen:?}"
    );
}
