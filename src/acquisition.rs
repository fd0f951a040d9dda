use morphview::{Frame, ScanConfig, SensorLibrary, Session};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Move `session` onto a background thread that scans with `config` and sends
/// every decoded frame over a channel. Corrupt frames are dropped by
/// `Session::frames`; the session is closed when the receiver goes away or a
/// read fails.
pub fn spawn_acquisition_thread<L: SensorLibrary>(
    mut session: Session<L>,
    config: ScanConfig,
) -> mpsc::Receiver<Frame> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        if let Err(e) = session.configure(&config).and_then(|()| session.start()) {
            tracing::error!("viewer: failed to start scanning: {}", e);
            return;
        }

        loop {
            match session.frames() {
                Ok(frames) if frames.is_empty() => {
                    thread::sleep(Duration::from_millis(5));
                }
                Ok(frames) => {
                    for frame in frames {
                        if tx.send(frame).is_err() {
                            // Receiver dropped, UI closed
                            tracing::debug!("viewer closed, stopping acquisition");
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("viewer: frame read error: {}", e);
                    break;
                }
            }
        }
    });

    rx
}
