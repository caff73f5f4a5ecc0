use devpoll_transport::{ConnectionGuard, TcpConfig, TcpTransport, Transport, TransportError};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::Instant;

#[tokio::test]
async fn tcp_echo_roundtrip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut buf = [0u8; 16];
        let n = socket.read(&mut buf).await.expect("read");
        socket.write_all(&buf[..n]).await.expect("write");
    });

    let mut transport = TcpTransport::new(TcpConfig::new(addr.to_string()));
    {
        let mut conn = ConnectionGuard::acquire(&mut transport)
            .await
            .expect("connect");
        conn.write(b"Q1\r").await.expect("write");
        let deadline = Instant::now() + Duration::from_secs(2);
        let data = conn.read_until(deadline).await.expect("read");
        assert_eq!(data, b"Q1\r");
        assert!(conn.is_connected());
    }
    // 守卫离开作用域后链路已关闭
    assert!(!transport.is_connected());

    server.await.expect("server");
}

#[tokio::test]
async fn read_until_times_out_on_silent_peer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("accept");
        tokio::time::sleep(Duration::from_millis(500)).await;
        drop(socket);
    });

    let mut transport = TcpTransport::new(TcpConfig::new(addr.to_string()));
    transport.connect().await.expect("connect");

    let started = Instant::now();
    let err = transport
        .read_until(Instant::now() + Duration::from_millis(100))
        .await
        .expect_err("silent peer");
    assert!(matches!(err, TransportError::Timeout));
    assert!(started.elapsed() < Duration::from_millis(400));

    transport.close().expect("close");
    server.await.expect("server");
}

#[tokio::test]
async fn connect_refused_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let mut transport = TcpTransport::new(TcpConfig::new(addr.to_string()));
    let result = ConnectionGuard::acquire(&mut transport).await;
    assert!(matches!(result, Err(TransportError::Connect(_))));
}
