use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::engine::TransportOptions;

use super::thread::spawn_control_thread;
use super::types::{PlayerStatus, StatusHandle, TransportCmd};

/// Front door to the control thread. Commands are queued and executed one at
/// a time; results show up in the status handle.
pub struct MultitrackPlayer {
    tx: Sender<TransportCmd>,
    status: StatusHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl MultitrackPlayer {
    pub fn new(options: TransportOptions) -> Self {
        let (tx, rx) = mpsc::channel::<TransportCmd>();
        let status: StatusHandle = Arc::new(Mutex::new(PlayerStatus::default()));

        let handle = spawn_control_thread(rx, status.clone(), options);

        Self {
            tx,
            status,
            join: Mutex::new(Some(handle)),
        }
    }

    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    pub fn send(&self, cmd: TransportCmd) -> Result<(), mpsc::SendError<TransportCmd>> {
        self.tx.send(cmd)
    }

    /// Release every track and wait for the control thread to exit.
    pub fn quit(&self) {
        let _ = self.send(TransportCmd::Quit);

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}
