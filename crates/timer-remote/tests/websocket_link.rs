use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use timer_remote::{
    Action, ConnectionState, ControlSurface, Dispatched, Notification, SurfaceEvent, TimeSpan,
    Timer, TimingMethod, WebSocketConnector,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Default)]
struct LoggedTimer {
    calls: Vec<String>,
}

impl Timer for LoggedTimer {
    fn current_comparison(&self) -> &str {
        "Personal Best"
    }
    fn current_timing_method(&self) -> TimingMethod {
        TimingMethod::RealTime
    }
    fn start(&mut self) {
        self.calls.push("start".into());
    }
    fn split(&mut self) {
        self.calls.push("split".into());
    }
    fn split_or_start(&mut self) {
        self.calls.push("split_or_start".into());
    }
    fn reset(&mut self, _update_splits: bool) {
        self.calls.push("reset".into());
    }
    fn toggle_pause_or_start(&mut self) {
        self.calls.push("toggle_pause_or_start".into());
    }
    fn undo_split(&mut self) {
        self.calls.push("undo_split".into());
    }
    fn skip_split(&mut self) {
        self.calls.push("skip_split".into());
    }
    fn initialize_game_time(&mut self) {
        self.calls.push("initialize_game_time".into());
    }
    fn set_game_time(&mut self, time: TimeSpan) {
        self.calls.push(format!("set_game_time {time}"));
    }
    fn set_loading_times(&mut self, time: TimeSpan) {
        self.calls.push(format!("set_loading_times {time}"));
    }
    fn pause_game_time(&mut self) {
        self.calls.push("pause_game_time".into());
    }
    fn resume_game_time(&mut self) {
        self.calls.push("resume_game_time".into());
    }
    fn switch_to_previous_comparison(&mut self) {}
    fn switch_to_next_comparison(&mut self) {}
    fn set_current_timing_method(&mut self, _method: TimingMethod) {}
}

type Surface = ControlSurface<RwLock<LoggedTimer>, WebSocketConnector>;

fn surface() -> Surface {
    ControlSurface::new(Arc::new(RwLock::new(LoggedTimer::default())), WebSocketConnector)
}

async fn next_event(surface: &mut Surface) -> SurfaceEvent {
    timeout(Duration::from_secs(5), surface.next_event())
        .await
        .expect("surface event before timeout")
}

#[tokio::test]
async fn peer_drives_timer_and_receives_local_echo() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<String>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        ws.send(Message::Text("split".into())).await.expect("send split");
        ws.send(Message::Text("bogus foo bar".into()))
            .await
            .expect("send bogus");
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                seen_tx.send(text).ok();
                break;
            }
        }
        ws.close(None).await.ok();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let mut surface = surface();
    assert!(surface.connect(&format!("ws://{addr}")).expect("valid address"));
    assert_eq!(surface.connection_state(), ConnectionState::Connecting);

    assert_eq!(
        next_event(&mut surface).await,
        SurfaceEvent::Notice(Notification::Connected)
    );
    assert_eq!(surface.connection_state(), ConnectionState::Open);

    assert_eq!(
        next_event(&mut surface).await,
        SurfaceEvent::Remote {
            line: "split".into(),
            outcome: Dispatched::Applied {
                action: Action::Split,
                echoed: false
            }
        }
    );
    assert!(matches!(
        next_event(&mut surface).await,
        SurfaceEvent::Remote {
            outcome: Dispatched::Unknown,
            ..
        }
    ));
    assert_eq!(surface.connection_state(), ConnectionState::Open);

    let outcome = surface.trigger("setgametime", &["1:23.45"]);
    assert_eq!(
        outcome,
        Dispatched::Applied {
            action: Action::SetGameTime,
            echoed: true
        }
    );
    let echoed = timeout(Duration::from_secs(5), seen_rx.recv())
        .await
        .expect("echo before timeout")
        .expect("echo line");
    assert_eq!(echoed, "setgametime 1:23.45");

    assert_eq!(
        next_event(&mut surface).await,
        SurfaceEvent::Notice(Notification::Disconnected)
    );
    assert_eq!(surface.connection_state(), ConnectionState::Closed);
    assert_eq!(
        surface.timer().read().calls,
        vec!["split".to_string(), "set_game_time 1:23.450".to_string()]
    );

    server.await.expect("server task");
}

#[tokio::test]
async fn unreachable_peer_reports_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        listener.local_addr().expect("local addr").port()
    };

    let mut surface = surface();
    surface
        .connect(&format!("ws://127.0.0.1:{port}"))
        .expect("valid address");

    match next_event(&mut surface).await {
        SurfaceEvent::Notice(notice) => assert!(notice.is_error(), "unexpected notice {notice:?}"),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(surface.connection_state(), ConnectionState::Closed);
}

#[tokio::test]
async fn local_disconnect_closes_the_peer_side() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        let mut saw_close = false;
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                saw_close = true;
            }
        }
        saw_close
    });

    let mut surface = surface();
    surface.connect(&format!("ws://{addr}")).expect("valid address");
    assert_eq!(
        next_event(&mut surface).await,
        SurfaceEvent::Notice(Notification::Connected)
    );

    assert!(surface.disconnect());
    assert_eq!(surface.connection_state(), ConnectionState::Closing);
    assert!(!surface.disconnect());
    assert_eq!(
        next_event(&mut surface).await,
        SurfaceEvent::Notice(Notification::Disconnected)
    );
    assert_eq!(surface.connection_state(), ConnectionState::Closed);

    let saw_close = timeout(Duration::from_secs(5), server)
        .await
        .expect("server finished")
        .expect("server task");
    assert!(saw_close);
}
