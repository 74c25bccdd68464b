use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError, mpsc as std_mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Framed;

use crate::domain::broker_system_model::intercomponent::codec::EnvelopeCodec;
use crate::domain::broker_system_model::intercomponent::handlers::RpcRouter;
use crate::domain::broker_system_model::intercomponent::protocol::Envelope;
use crate::domain::broker_system_model::intercomponent::transport::PacketSender;
use crate::domain::broker_system_model::utils::id::MemberId;

struct Exchange {
    address: SocketAddr,
    envelope: Envelope,
    timeout: Duration,
    reply: std_mpsc::Sender<Option<Envelope>>,
}

/// Client side of the TCP transport.
///
/// Owns a dedicated I/O thread running a tokio runtime; every request opens a
/// connection, writes one envelope and reads one envelope back. Callers block on
/// a std channel bounded by the request timeout.
pub struct TcpPacketSender {
    peers: HashMap<MemberId, SocketAddr>,
    exchanges: mpsc::UnboundedSender<Exchange>,
    _io_thread: JoinHandle<()>,
}

impl TcpPacketSender {
    pub fn new(peers: HashMap<MemberId, SocketAddr>) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread().worker_threads(2).thread_name("rpc-client-worker").enable_all().build()?;
        let (exchanges, mut pending) = mpsc::unbounded_channel::<Exchange>();

        let io_thread = thread::Builder::new().name("rpc-client-io".to_string()).spawn(move || {
            runtime.block_on(async move {
                while let Some(exchange) = pending.recv().await {
                    tokio::spawn(async move {
                        let result = tokio::time::timeout(exchange.timeout, request_response(exchange.address, exchange.envelope)).await;
                        let response = match result {
                            Ok(Ok(response)) => response,
                            Ok(Err(e)) => {
                                log::warn!("RPC exchange with {} failed: {}", exchange.address, e);
                                None
                            }
                            Err(_) => None,
                        };
                        let _ = exchange.reply.send(response);
                    });
                }
                log::debug!("RPC client I/O loop finished");
            });
        })?;

        Ok(TcpPacketSender { peers, exchanges, _io_thread: io_thread })
    }
}

async fn request_response(address: SocketAddr, envelope: Envelope) -> io::Result<Option<Envelope>> {
    let stream = TcpStream::connect(address).await?;
    stream.set_nodelay(true)?;

    let mut framed = Framed::new(stream, EnvelopeCodec::new());
    framed.send(envelope).await?;

    match framed.next().await {
        Some(Ok(response)) => Ok(Some(response)),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

impl PacketSender for TcpPacketSender {
    fn send_sync(&self, envelope: Envelope, timeout: Duration) -> Option<Envelope> {
        let Some(address) = self.peers.get(&envelope.target_id).copied() else {
            log::warn!("No address known for member {}", envelope.target_id);
            return None;
        };

        let (reply, response) = std_mpsc::channel();
        if self.exchanges.send(Exchange { address, envelope, timeout, reply }).is_err() {
            log::error!("RPC client I/O thread is gone");
            return None;
        }

        response.recv_timeout(timeout).ok().flatten()
    }
}

/// Server side of the TCP transport.
///
/// Accepts connections on its own I/O thread and hands every inbound envelope
/// to the `RpcRouter` on tokio's blocking pool.
pub struct TcpRpcServer {
    local_addr: SocketAddr,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    io_thread: Mutex<Option<JoinHandle<()>>>,
}

impl TcpRpcServer {
    pub fn bind(address: SocketAddr, router: Arc<RpcRouter>) -> io::Result<Self> {
        let std_listener = std::net::TcpListener::bind(address)?;
        std_listener.set_nonblocking(true)?;
        let local_addr = std_listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_multi_thread().worker_threads(2).thread_name("rpc-server-worker").enable_all().build()?;
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let io_thread = thread::Builder::new().name("rpc-server-io".to_string()).spawn(move || {
            runtime.block_on(async move {
                let listener = match TcpListener::from_std(std_listener) {
                    Ok(listener) => listener,
                    Err(e) => {
                        log::error!("Could not register listener on {}: {}", local_addr, e);
                        return;
                    }
                };

                log::info!("Member {} accepting RPC connections on {}", router.local_member(), local_addr);

                loop {
                    tokio::select! {
                        _ = &mut shutdown_rx => break,
                        accepted = listener.accept() => match accepted {
                            Ok((stream, peer)) => {
                                tokio::spawn(serve_connection(stream, peer, router.clone()));
                            }
                            Err(e) => log::warn!("Accept failed on {}: {}", local_addr, e),
                        },
                    }
                }

                log::info!("RPC server on {} stopped", local_addr);
            });
            runtime.shutdown_timeout(Duration::from_secs(1));
        })?;

        Ok(TcpRpcServer { local_addr, shutdown: Mutex::new(Some(shutdown_tx)), io_thread: Mutex::new(Some(io_thread)) })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown(&self) {
        if let Some(shutdown) = self.shutdown.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = shutdown.send(());
        }
        if let Some(io_thread) = self.io_thread.lock().unwrap_or_else(PoisonError::into_inner).take() {
            if io_thread.join().is_err() {
                log::error!("RPC server I/O thread panicked");
            }
        }
    }
}

impl Drop for TcpRpcServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, router: Arc<RpcRouter>) {
    let mut framed = Framed::new(stream, EnvelopeCodec::new());

    while let Some(frame) = framed.next().await {
        let envelope = match frame {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("Dropping connection from {}: {}", peer, e);
                return;
            }
        };

        let router = router.clone();
        let response = match tokio::task::spawn_blocking(move || router.dispatch(envelope)).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Dispatch task for {} failed: {}", peer, e);
                return;
            }
        };

        if let Err(e) = framed.send(response).await {
            log::warn!("Could not answer {}: {}", peer, e);
            return;
        }
    }
}
