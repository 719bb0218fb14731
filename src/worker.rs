use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use crate::config::AppConfig;
use crate::download::save_artifact;
use crate::protocol::ProtocolClient;
use crate::state::{Delta, WorkerCommand};
use crate::transport::{ReqwestTransport, Transport};

pub fn spawn_worker(tx: Sender<Delta>, cmd_rx: Receiver<WorkerCommand>, config: AppConfig) {
    thread::spawn(move || {
        let transport = match ReqwestTransport::new(config.request_timeout) {
            Ok(transport) => transport,
            Err(err) => {
                let _ = tx.send(Delta::Log(format!("[WARN] HTTP client unavailable: {err:#}")));
                return;
            }
        };
        let client = ProtocolClient::new(config.api_base.clone(), transport);
        run_worker(&client, &config, &tx, cmd_rx);
    });
}

/// Processes commands one at a time until the UI hangs up.
pub fn run_worker<T: Transport>(
    client: &ProtocolClient<T>,
    config: &AppConfig,
    tx: &Sender<Delta>,
    cmd_rx: Receiver<WorkerCommand>,
) {
    for cmd in cmd_rx {
        match cmd {
            WorkerCommand::Submit(job) => {
                let outcome = client.submit(&job.file, &job.analyses);
                drop(job.file);
                if tx
                    .send(Delta::RunFinished {
                        run_id: job.run_id,
                        outcome,
                    })
                    .is_err()
                {
                    return;
                }
            }
            WorkerCommand::Download(artifact) => {
                let delta =
                    match save_artifact(client.transport(), &artifact, &config.download_dir) {
                        Ok(path) => Delta::Downloaded {
                            name: artifact.name.clone(),
                            path,
                        },
                        Err(err) => Delta::Log(format!("[WARN] Download failed: {err:#}")),
                    };
                if tx.send(delta).is_err() {
                    return;
                }
            }
        }
    }
}
