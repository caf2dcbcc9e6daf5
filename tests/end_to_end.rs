//! End-to-end tests over real sockets: a full server instance bound to
//! ephemeral ports, driven by plain UDP datagrams and TCP lines.

use std::net::SocketAddr;
use std::time::Duration;

use prometheus::Registry;
use quotagate::{Config, Metrics, Server};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

struct Running {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Running {
    async fn stop(self) {
        self.shutdown.send(true).expect("server still listening");
        timeout(REPLY_TIMEOUT, self.handle)
            .await
            .expect("server drains after shutdown")
            .expect("server task completes");
    }
}

async fn start_server() -> Running {
    let config = Config { port: 0, metrics_port: 0 };
    let metrics = Metrics::new(Registry::new()).expect("fresh registry");
    let server = Server::bind(&config, metrics).await.expect("bind ephemeral ports");
    let addr = SocketAddr::from(([127, 0, 0, 1], server.local_addr().port()));
    let (shutdown, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(server.run(shutdown_rx));
    Running { addr, shutdown, handle }
}

async fn udp_query(socket: &UdpSocket, addr: SocketAddr, line: &str) -> u8 {
    socket.send_to(line.as_bytes(), addr).await.expect("send datagram");
    let mut buf = [0u8; 8];
    let (len, _) = timeout(REPLY_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .expect("reply within timeout")
        .expect("receive reply");
    assert_eq!(len, 1, "reply is a single byte");
    buf[0]
}

#[tokio::test]
async fn udp_permits_up_to_capacity_then_denies() {
    let server = start_server().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    for _ in 0..10 {
        assert_eq!(udp_query(&socket, server.addr, "gb,l,10,1").await, b'p');
    }
    assert_eq!(udp_query(&socket, server.addr, "gb,l,10,1").await, b'd');

    server.stop().await;
}

#[tokio::test]
async fn udp_denies_a_draw_larger_than_the_remaining_value() {
    let server = start_server().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    assert_eq!(udp_query(&socket, server.addr, "gb,l,10,4").await, b'p');
    assert_eq!(udp_query(&socket, server.addr, "gb,l,10,4").await, b'p');
    // 2 left, cost 4: all-or-nothing
    assert_eq!(udp_query(&socket, server.addr, "gb,l,10,4").await, b'd');

    server.stop().await;
}

#[tokio::test]
async fn udp_meters_accounts_independently() {
    let server = start_server().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    assert_eq!(udp_query(&socket, server.addr, "alice,w,5,1").await, b'p');
    assert_eq!(udp_query(&socket, server.addr, "bob,w,5,1").await, b'p');
    // alice has 4 left, a draw of 5 is refused outright
    assert_eq!(udp_query(&socket, server.addr, "alice,w,5,5").await, b'd');
    assert_eq!(udp_query(&socket, server.addr, "alice,w,5,4").await, b'p');
    assert_eq!(udp_query(&socket, server.addr, "alice,w,5,1").await, b'd');
    // bob is untouched by alice's exhaustion
    assert_eq!(udp_query(&socket, server.addr, "bob,w,5,1").await, b'p');

    server.stop().await;
}

#[tokio::test]
async fn udp_denies_malformed_datagrams() {
    let server = start_server().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    assert_eq!(udp_query(&socket, server.addr, "gb,x,10,1").await, b'd');
    assert_eq!(udp_query(&socket, server.addr, "gibberish").await, b'd');
    assert_eq!(udp_query(&socket, server.addr, "gb,l,-10,1").await, b'd');

    server.stop().await;
}

#[tokio::test]
async fn udp_allowance_returns_after_a_refill_tick() {
    let server = start_server().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    for _ in 0..10 {
        assert_eq!(udp_query(&socket, server.addr, "gb,l,10,1").await, b'p');
    }
    assert_eq!(udp_query(&socket, server.addr, "gb,l,10,1").await, b'd');

    // the refill clock sweeps once per second
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    assert_eq!(udp_query(&socket, server.addr, "gb,l,10,1").await, b'p');

    server.stop().await;
}

#[tokio::test]
async fn tcp_serves_many_requests_per_connection() {
    let server = start_server().await;
    let stream = TcpStream::connect(server.addr).await.expect("connect");
    let (read_half, mut write_half) = stream.into_split();
    let mut replies = BufReader::new(read_half).lines();

    for expected in ["p", "p", "p", "d"] {
        write_half.write_all(b"gb,q,3,1\n").await.expect("send line");
        let reply = timeout(REPLY_TIMEOUT, replies.next_line())
            .await
            .expect("reply within timeout")
            .expect("read reply")
            .expect("connection open");
        assert_eq!(reply, expected);
    }

    server.stop().await;
}

#[tokio::test]
async fn tcp_answers_malformed_lines_with_deny_and_keeps_the_connection() {
    let server = start_server().await;
    let stream = TcpStream::connect(server.addr).await.expect("connect");
    let (read_half, mut write_half) = stream.into_split();
    let mut replies = BufReader::new(read_half).lines();

    for (line, expected) in
        [("nonsense\n", "d"), ("gb,l,10,one\n", "d"), ("gb,l,10,1\n", "p")]
    {
        write_half.write_all(line.as_bytes()).await.expect("send line");
        let reply = timeout(REPLY_TIMEOUT, replies.next_line())
            .await
            .expect("reply within timeout")
            .expect("read reply")
            .expect("connection open");
        assert_eq!(reply, expected);
    }

    server.stop().await;
}

#[tokio::test]
async fn udp_and_tcp_share_one_account_store() {
    let server = start_server().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // drain 3 of 4 over UDP, the last one over TCP
    for _ in 0..3 {
        assert_eq!(udp_query(&socket, server.addr, "shared,w,4,1").await, b'p');
    }

    let stream = TcpStream::connect(server.addr).await.expect("connect");
    let (read_half, mut write_half) = stream.into_split();
    let mut replies = BufReader::new(read_half).lines();
    for expected in ["p", "d"] {
        write_half.write_all(b"shared,w,4,1\n").await.expect("send line");
        let reply = timeout(REPLY_TIMEOUT, replies.next_line())
            .await
            .expect("reply within timeout")
            .expect("read reply")
            .expect("connection open");
        assert_eq!(reply, expected);
    }

    server.stop().await;
}
