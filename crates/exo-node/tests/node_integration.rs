//! End-to-end tests: a real `Node` on localhost talking to a raw UDP socket
//! that plays the peer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use exo_core::{decode_message, JointPose, PeerMessage, Role};
use exo_node::application::drive_joints::{Actuator, ActuatorDevice, JointRig};
use exo_node::application::fault::NodeError;
use exo_node::application::node_state::NodeState;
use exo_node::application::record_session::SessionRecorder;
use exo_node::infrastructure::actuators::RecordingActuatorDevice;
use exo_node::infrastructure::network::NodeIdentity;
use exo_node::infrastructure::session_log::SessionLog;
use exo_node::infrastructure::storage::config::TimingConfig;
use exo_node::Node;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn fast_timing() -> TimingConfig {
    TimingConfig {
        publish_interval_ms: 5,
        limiter_poll_interval_ms: 2,
        limiter_settle_ms: 5,
        actuation_queue_depth: 8,
    }
}

struct Harness {
    device: Arc<RecordingActuatorDevice>,
    state: Arc<NodeState>,
    node_addr: SocketAddr,
    peer: UdpSocket,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), NodeError>>,
}

impl Harness {
    /// Starts a node on 127.0.0.1 whose peer is a raw socket bound on `peer_ip`.
    async fn start(peer_ip: &str, session: Arc<dyn SessionRecorder>) -> Self {
        Self::start_with_device(peer_ip, session, Arc::new(RecordingActuatorDevice::new())).await
    }

    async fn start_with_device(
        peer_ip: &str,
        session: Arc<dyn SessionRecorder>,
        device: Arc<RecordingActuatorDevice>,
    ) -> Self {
        let peer = UdpSocket::bind(format!("{peer_ip}:0")).await.unwrap();
        let identity = NodeIdentity {
            node_name: "bench".into(),
            local: "127.0.0.1:0".parse().unwrap(),
            peer: peer.local_addr().unwrap(),
        };
        let rig = Arc::new(JointRig::new(Arc::clone(&device) as Arc<dyn ActuatorDevice>));
        let node = Node::bind(identity, fast_timing(), rig, session)
            .await
            .unwrap();
        let node_addr = node.local_addr().unwrap();
        let state = node.state();
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(node.run(async move {
            let _ = stopped.await;
        }));
        Self {
            device,
            state,
            node_addr,
            peer,
            stop: Some(stop),
            handle,
        }
    }

    async fn send(&self, text: &str) {
        self.peer
            .send_to(text.as_bytes(), self.node_addr)
            .await
            .unwrap();
    }

    async fn stop(mut self) -> (Result<(), NodeError>, Arc<RecordingActuatorDevice>) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("node must stop")
            .unwrap();
        (result, self.device)
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn has_elbow_and_wrist_targets(device: &RecordingActuatorDevice, elbow: f64, wrist: f64) -> bool {
    let targets = device.targets();
    targets.contains(&(Actuator::ElbowA, -elbow))
        && targets.contains(&(Actuator::ElbowC, -elbow))
        && targets.contains(&(Actuator::Wrist, -wrist))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_follower_applies_control_from_peer() {
    // Arrange
    let node = Harness::start("127.0.0.1", Arc::new(SessionLog::disabled())).await;

    // Act
    node.send("control,10.0,5.0,12:00:00.000000").await;
    wait_until(|| has_elbow_and_wrist_targets(&node.device, 10.0, 5.0)).await;

    // Assert
    assert_eq!(node.state.role(), Role::Follower);
    let (result, device) = node.stop().await;
    assert!(result.is_ok());
    assert_eq!(device.shutdown_count(), 1);
}

#[tokio::test]
async fn test_master_true_control_master_false_scenario() {
    // Arrange
    let node = Harness::start("127.0.0.1", Arc::new(SessionLog::disabled())).await;

    // Act
    node.send("master true").await;
    node.send("control,10.0,5.0,12:00:00.000000").await;
    node.send("master false").await;
    wait_until(|| has_elbow_and_wrist_targets(&node.device, 10.0, 5.0)).await;
    wait_until(|| node.state.role() == Role::Follower).await;

    // Assert – becoming master released every actuator
    for actuator in Actuator::ALL {
        assert!(node.device.releases().contains(&actuator));
    }
    let (result, _) = node.stop().await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_master_publishes_changed_pose_to_peer() {
    // Arrange
    let node = Harness::start("127.0.0.1", Arc::new(SessionLog::disabled())).await;
    node.send("master true").await;
    wait_until(|| node.state.role() == Role::Master).await;

    // Act
    node.device.set_pose(JointPose::new(20.0, 3.0));

    // Assert – skip any pose published before the move
    let mut buf = [0u8; 1024];
    let published = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (len, _) = node.peer.recv_from(&mut buf).await.unwrap();
            if let Ok(PeerMessage::Control(c)) = decode_message(&buf[..len]) {
                if c.pose() == JointPose::new(20.0, 3.0) {
                    return c;
                }
            }
        }
    })
    .await
    .expect("pose must be published");
    assert!(!published.timestamp.is_empty());
    node.stop().await.0.unwrap();
}

#[tokio::test]
async fn test_datagram_from_non_peer_changes_nothing() {
    // Arrange – the configured peer lives on 127.0.0.2
    let node = Harness::start("127.0.0.2", Arc::new(SessionLog::disabled())).await;
    let intruder = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // Act
    intruder
        .send_to(b"master true", node.node_addr)
        .await
        .unwrap();
    node.send("border upper 5").await;
    wait_until(|| node.state.boundary().upper == Some(5.0)).await;

    // Assert
    assert_eq!(node.state.role(), Role::Follower);
    assert!(node.device.releases().is_empty());
    node.stop().await.0.unwrap();
}

#[tokio::test]
async fn test_malformed_datagrams_do_not_stop_the_node() {
    let node = Harness::start("127.0.0.1", Arc::new(SessionLog::disabled())).await;

    for junk in ["control,1.0", "master maybe", "", "\u{0}\u{1}", "border sideways 3"] {
        node.send(junk).await;
    }
    node.send("border lower -15").await;
    wait_until(|| node.state.boundary().lower == Some(-15.0)).await;

    assert!(!node.handle.is_finished());
    node.stop().await.0.unwrap();
}

#[tokio::test]
async fn test_device_fault_stops_node_and_runs_cleanup() {
    // Arrange
    let node = Harness::start("127.0.0.1", Arc::new(SessionLog::disabled())).await;

    // Act – the next publisher tick fails to read the rig
    node.device.set_should_fail(true);
    let result = tokio::time::timeout(Duration::from_secs(5), node.handle)
        .await
        .expect("node must stop on a device fault")
        .unwrap();

    // Assert
    assert!(matches!(result, Err(NodeError::Device(_))));
    assert_eq!(node.device.shutdown_count(), 1);
}

#[tokio::test]
async fn test_border_limiter_clamps_master_elbow() {
    // Arrange
    let node = Harness::start("127.0.0.1", Arc::new(SessionLog::disabled())).await;
    node.send("master true").await;
    node.send("border upper 60").await;
    node.send("border lower -10").await;
    wait_until(|| node.state.role() == Role::Master).await;

    // Act – operator pushes the elbow past the upper bound
    node.device.set_pose(JointPose::new(75.0, 0.0));
    node.send("border true").await;

    // Assert – both elbow actuators are driven to -upper
    wait_until(|| {
        let targets = node.device.targets();
        targets.contains(&(Actuator::ElbowA, -60.0)) && targets.contains(&(Actuator::ElbowC, -60.0))
    })
    .await;
    assert!(node.state.border_enabled());
    node.send("border false").await;
    wait_until(|| !node.state.border_enabled()).await;
    node.stop().await.0.unwrap();
}

#[tokio::test]
async fn test_session_log_records_markers_and_switches() {
    // Arrange
    let tmp = tempfile::tempdir().unwrap();
    let log = Arc::new(SessionLog::open(tmp.path()).unwrap());
    let node = Harness::start("127.0.0.1", Arc::clone(&log) as Arc<dyn SessionRecorder>).await;

    // Act
    node.send("log Reach").await;
    wait_until(|| {
        log.current_path()
            .map(|p| p.to_string_lossy().contains("reach_follower_"))
            .unwrap_or(false)
    })
    .await;
    node.send("sequence start 1").await;
    let path = log.current_path().unwrap();
    wait_until(|| {
        std::fs::read_to_string(&path)
            .map(|text| text.lines().any(|l| l == "sequence start 1"))
            .unwrap_or(false)
    })
    .await;

    // Assert – pose records follow the header
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("timestamp,value_elbow,value_wrist\n"));
    node.stop().await.0.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_device_reads_do_not_delay_peer_messages() {
    // Arrange – each pose sample spends 450 ms on the bus
    let device = Arc::new(RecordingActuatorDevice::new());
    device.set_read_delay(Duration::from_millis(150));
    let node =
        Harness::start_with_device("127.0.0.1", Arc::new(SessionLog::disabled()), device).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Act
    let mut worst = Duration::ZERO;
    for i in 1..=5 {
        let upper = f64::from(i);
        let sent = Instant::now();
        node.send(&format!("border upper {i}")).await;
        wait_until(|| node.state.boundary().upper == Some(upper)).await;
        worst = worst.max(sent.elapsed());
    }

    // Assert
    assert!(worst < Duration::from_millis(100), "worst latency {worst:?}");
    node.stop().await.0.unwrap();
}
