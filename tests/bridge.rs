//! End-to-end bridge tests over a real listening socket and an in-memory
//! serial link.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use skylink::bridge::{Bridge, BridgeExit};
use skylink::config::create_config;
use skylink::serial::SerialLink;
use skylink::shutdown::ShutdownToken;

/// Serial device double: the test pushes bytes "produced by the device"
/// into `from_device` and observes bytes the bridge wrote in `to_device`.
#[derive(Clone, Default)]
struct MockSerial {
    from_device: Arc<Mutex<VecDeque<u8>>>,
    to_device: Arc<Mutex<Vec<u8>>>,
}

impl MockSerial {
    fn push(&self, bytes: &[u8]) {
        self.from_device.lock().unwrap().extend(bytes.iter().copied());
    }

    fn written(&self) -> Vec<u8> {
        self.to_device.lock().unwrap().clone()
    }
}

impl SerialLink for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> skylink::Result<usize> {
        let mut queue = self.from_device.lock().unwrap();
        if queue.is_empty() {
            drop(queue);
            // Behaves like the bounded poll timeout of a real device.
            thread::sleep(Duration::from_millis(2));
            return Ok(0);
        }
        let n = queue.len().min(buf.len());
        for slot in buf[..n].iter_mut() {
            *slot = queue.pop_front().unwrap();
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> skylink::Result<()> {
        self.to_device.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    fn try_clone(&self) -> skylink::Result<Box<dyn SerialLink>> {
        Ok(Box::new(self.clone()))
    }
}

struct Harness {
    serial: MockSerial,
    addr: SocketAddr,
    shutdown: ShutdownToken,
    bridge: JoinHandle<skylink::Result<BridgeExit>>,
}

impl Harness {
    fn start() -> Self {
        let mut config = create_config();
        config.tcp.bind_address = "127.0.0.1";
        config.tcp.port = 0;
        config.tcp.read_timeout = Duration::from_millis(10);
        config.tcp.accept_poll = Duration::from_millis(10);

        let serial = MockSerial::default();
        let bridge = Bridge::new(config, Box::new(serial.clone())).unwrap();
        let addr = bridge.local_addr().unwrap();
        let shutdown = bridge.shutdown_handle();
        let bridge = thread::spawn(move || bridge.run());

        Self {
            serial,
            addr,
            shutdown,
            bridge,
        }
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();
        stream
    }

    /// Send bytes from a client and wait until the serial side has seen
    /// them; proves the manager is servicing exactly this client.
    fn sync_client(&self, client: &mut TcpStream, marker: &[u8]) {
        client.write_all(marker).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if self.serial.written().ends_with(marker) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("serial side never observed {:?}", marker);
    }

    fn stop(self) -> BridgeExit {
        self.shutdown.trigger();
        self.bridge.join().unwrap().unwrap()
    }
}

/// Read from a client until `want` bytes arrived, EOF, or the deadline.
fn read_until(stream: &mut TcpStream, want: usize, deadline: Duration) -> Vec<u8> {
    let start = Instant::now();
    let mut out = Vec::new();
    let mut buf = [0u8; 256];
    while start.elapsed() < deadline && out.len() < want {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                continue
            }
            Err(_) => break,
        }
    }
    out
}

#[test]
fn client_bytes_reach_serial_in_order() {
    let harness = Harness::start();
    let mut client = harness.connect();

    client.write_all(b"ping").unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while harness.serial.written() != b"ping" && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(harness.serial.written(), b"ping");

    assert_eq!(harness.stop(), BridgeExit::Stopped);
}

#[test]
fn serial_bytes_reach_attached_client_in_order() {
    let harness = Harness::start();
    let mut client = harness.connect();
    harness.sync_client(&mut client, b"syn");

    harness.serial.push(b"hello");

    let received = read_until(&mut client, 5, Duration::from_secs(2));
    assert_eq!(received, b"hello");

    harness.stop();
}

#[test]
fn serial_bytes_without_client_are_lost() {
    let harness = Harness::start();

    // No client attached: these bytes must never surface later.
    harness.serial.push(b"lost");
    thread::sleep(Duration::from_millis(100));

    let mut client = harness.connect();
    harness.sync_client(&mut client, b"syn");
    harness.serial.push(b"seen");

    let received = read_until(&mut client, 8, Duration::from_millis(500));
    assert_eq!(received, b"seen");

    harness.stop();
}

#[test]
fn control_byte_resets_and_is_never_forwarded() {
    let harness = Harness::start();
    let mut client = harness.connect();
    harness.sync_client(&mut client, b"syn");

    harness.serial.push(b"@reset");

    let exit = harness.bridge.join().unwrap().unwrap();
    assert_eq!(exit, BridgeExit::ResetRequested);

    // The control chunk was consumed; the client observes only the close.
    let received = read_until(&mut client, 1, Duration::from_millis(500));
    assert!(received.is_empty());
}

#[test]
fn second_client_waits_for_first_to_disconnect() {
    let harness = Harness::start();

    let mut first = harness.connect();
    harness.sync_client(&mut first, b"one");

    let mut second = harness.connect();
    second.write_all(b"two").unwrap();

    harness.serial.push(b"first");
    assert_eq!(read_until(&mut first, 5, Duration::from_secs(2)), b"first");
    // The second connection is not serviced while the first is attached.
    assert!(read_until(&mut second, 1, Duration::from_millis(200)).is_empty());

    drop(first);

    // Once the first client is gone the manager services the second; its
    // queued bytes reaching the serial side proves the hand-over.
    let deadline = Instant::now() + Duration::from_secs(2);
    while !harness.serial.written().ends_with(b"two") && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(harness.serial.written().ends_with(b"two"));

    harness.serial.push(b"second");
    assert_eq!(
        read_until(&mut second, 6, Duration::from_secs(2)),
        b"second"
    );

    harness.stop();
}

#[test]
fn bytes_after_disconnect_never_reach_a_later_client() {
    let harness = Harness::start();

    let mut first = harness.connect();
    harness.sync_client(&mut first, b"one");
    drop(first);
    thread::sleep(Duration::from_millis(100));

    // Slot is empty between sessions: these bytes are discarded.
    harness.serial.push(b"between");
    thread::sleep(Duration::from_millis(100));

    let mut second = harness.connect();
    harness.sync_client(&mut second, b"two");
    harness.serial.push(b"visible");

    let received = read_until(&mut second, 7, Duration::from_millis(500));
    assert_eq!(received, b"visible");

    harness.stop();
}

#[test]
fn bind_failure_is_fatal_at_construction() {
    let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = create_config();
    config.tcp.bind_address = "127.0.0.1";
    config.tcp.port = occupied.local_addr().unwrap().port();

    let serial = MockSerial::default();
    let result = Bridge::new(config, Box::new(serial));
    assert!(matches!(result, Err(skylink::Error::Net(_))));
}
