//! Per-tenant SMPP connection pool: a counting semaphore bounds concurrent
//! connections, and a reclaimed-or-created idle queue hands out bound
//! clients. Connection loss is retried with the same backoff shape
//! `tower_resilience_reconnect::ReconnectPolicy` already implements rather
//! than a bespoke loop.

use crate::codec::SmppCodec;
use crate::dlr::{DeliveryReceipt, DlrCorrelator, DlrHook};
use crate::error::SmppError;
use crate::pdu::{BindKind, BindRequest, DeliverSmResp, Pdu, PduBody};
use crate::rate_limiter::SmppRateLimiter;
use dashmap::DashMap;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use message_hub_domain::SmppChannelConfig;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio_util::codec::Framed;
use tower_resilience_reconnect::ReconnectPolicy;

/// Any transport the codec can frame over: a plain `TcpStream` or a TLS
/// stream wrapping one.
trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

type SmppFramed = Framed<Box<dyn AsyncStream>, SmppCodec>;
type SmppSink = SplitSink<SmppFramed, Pdu>;
type SmppStream = SplitStream<SmppFramed>;
type PendingTable = DashMap<u32, oneshot::Sender<Pdu>>;

/// A bound SMPP connection checked out of the pool. Reading off the wire is
/// owned by a background task spawned at connect time (see
/// [`spawn_reader`]), not by the checkout holder: that task is what lets an
/// unsolicited `deliver_sm` DLR arrive while the connection is idle, or
/// while a different `submit_sm` is already in flight on it.
pub struct SmppConnection {
    sink: Arc<Mutex<SmppSink>>,
    sequence: AtomicU32,
    pending: Arc<PendingTable>,
    bound: Arc<AtomicBool>,
    reader: tokio::task::JoinHandle<()>,
}

impl SmppConnection {
    fn next_sequence(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Relaxed)
    }

    /// Sends `body` and waits for the reader task to hand back the PDU with
    /// the same sequence number. SMPP guarantees the SMSC echoes the
    /// request's sequence number on its response, so matching on sequence
    /// alone (without also checking the response command id) is sufficient.
    pub async fn send_and_await(&mut self, body: PduBody) -> Result<Pdu, SmppError> {
        let seq = self.next_sequence();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(seq, tx);

        let send_result = self.sink.lock().await.send(Pdu::new(seq, body)).await;
        if send_result.is_err() {
            self.pending.remove(&seq);
            return Err(SmppError::Closed);
        }

        rx.await.map_err(|_| SmppError::Closed)
    }

    pub async fn send_no_reply(&mut self, body: PduBody) -> Result<(), SmppError> {
        let seq = self.next_sequence();
        self.sink
            .lock()
            .await
            .send(Pdu::new(seq, body))
            .await
            .map_err(|_| SmppError::Closed)
    }
}

impl Drop for SmppConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Reads PDUs off `stream` for as long as the connection lives: routes
/// responses to whichever `send_and_await` call is waiting on that sequence
/// number, and feeds unsolicited `deliver_sm` DLR receipts to `correlator`,
/// acking each with a `deliver_sm_resp` before continuing.
fn spawn_reader(
    mut stream: SmppStream,
    sink: Arc<Mutex<SmppSink>>,
    pending: Arc<PendingTable>,
    bound: Arc<AtomicBool>,
    correlator: Arc<DlrCorrelator>,
    dlr_hook: Option<DlrHook>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            let pdu = match frame {
                Ok(pdu) => pdu,
                Err(_) => break,
            };

            match &pdu.body {
                PduBody::DeliverSm(msg) => {
                    if let Some(receipt) = std::str::from_utf8(&msg.short_message)
                        .ok()
                        .and_then(DeliveryReceipt::parse)
                    {
                        if let Some((internal_message_id, status)) = correlator.process_receipt(&receipt) {
                            if let Some(hook) = &dlr_hook {
                                hook(internal_message_id, status).await;
                            }
                        }
                    }
                    let ack = Pdu::new(
                        pdu.sequence_number,
                        PduBody::DeliverSmResp(DeliverSmResp {
                            message_id: String::new(),
                        }),
                    );
                    if sink.lock().await.send(ack).await.is_err() {
                        break;
                    }
                }
                PduBody::Unbind => {
                    bound.store(false, Ordering::Relaxed);
                    break;
                }
                _ => {
                    if let Some((_, tx)) = pending.remove(&pdu.sequence_number) {
                        let _ = tx.send(pdu);
                    }
                }
            }
        }
        bound.store(false, Ordering::Relaxed);
    })
}

async fn open_transport(config: &SmppChannelConfig) -> Result<Box<dyn AsyncStream>, SmppError> {
    let tcp = tokio::time::timeout(
        config.pool.connect_timeout,
        TcpStream::connect((config.host.as_str(), config.port)),
    )
    .await
    .map_err(|_| SmppError::Connect("connect timed out".into()))?
    .map_err(|e| SmppError::Connect(e.to_string()))?;

    if !config.use_tls {
        return Ok(Box::new(tcp));
    }

    let mut roots = tokio_rustls::rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = tokio_rustls::rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = tokio_rustls::TlsConnector::from(Arc::new(tls_config));
    let server_name = tokio_rustls::rustls::pki_types::ServerName::try_from(config.host.clone())
        .map_err(|_| SmppError::Connect("invalid TLS server name".into()))?;
    let stream = connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| SmppError::Connect(e.to_string()))?;
    Ok(Box::new(stream))
}

fn bind_kind_of(config: &SmppChannelConfig) -> BindKind {
    match config.bind_type {
        message_hub_domain::SmppBindType::Transceiver => BindKind::Transceiver,
        message_hub_domain::SmppBindType::Transmitter => BindKind::Transmitter,
        message_hub_domain::SmppBindType::Receiver => BindKind::Receiver,
    }
}

/// Connects, registers the bind request, waits for an `ESME_ROK` bind
/// response, and spawns the background reader that routes `submit_sm`
/// responses and hands unsolicited `deliver_sm` DLR receipts to `correlator`.
async fn connect_and_bind(
    config: &SmppChannelConfig,
    correlator: Arc<DlrCorrelator>,
    dlr_hook: Option<DlrHook>,
) -> Result<SmppConnection, SmppError> {
    let transport = open_transport(config).await?;
    let mut framed = Framed::new(transport, SmppCodec);

    let kind = bind_kind_of(config);
    let bind = PduBody::Bind(BindRequest {
        kind,
        system_id: config.system_id.clone(),
        password: config.password.clone(),
        system_type: String::new(),
        interface_version: 0x34,
        addr_ton: 0,
        addr_npi: 0,
        address_range: String::new(),
    });

    framed
        .send(Pdu::new(0, bind))
        .await
        .map_err(|_| SmppError::Closed)?;

    let resp = tokio::time::timeout(config.pool.connect_timeout, framed.next())
        .await
        .map_err(|_| SmppError::Connect("bind response timed out".into()))?
        .ok_or(SmppError::Closed)?
        .map_err(|_| SmppError::Closed)?;

    if !resp.command_status.is_ok() {
        return Err(SmppError::BindRejected(resp.command_status.into()));
    }
    match &resp.body {
        PduBody::BindResp(_) => {}
        _ => return Err(SmppError::Codec("expected bind response PDU".into())),
    }

    let (sink, stream) = framed.split();
    let sink = Arc::new(Mutex::new(sink));
    let pending: Arc<PendingTable> = Arc::new(DashMap::new());
    let bound = Arc::new(AtomicBool::new(true));
    let reader = spawn_reader(
        stream,
        Arc::clone(&sink),
        Arc::clone(&pending),
        Arc::clone(&bound),
        correlator,
        dlr_hook,
    );

    Ok(SmppConnection {
        sink,
        sequence: AtomicU32::new(1),
        pending,
        bound,
        reader,
    })
}

/// One pool per tenant: created on first submit, bounded by
/// `MaxConnections`, pre-warmed to `MinConnections` at construction. Also
/// owns the tenant's `submit_sm` send-rate gate, independent of the
/// connection-count cap.
pub struct SmppPool {
    config: SmppChannelConfig,
    semaphore: Arc<Semaphore>,
    idle: Mutex<VecDeque<SmppConnection>>,
    correlator: Arc<DlrCorrelator>,
    dlr_hook: Option<DlrHook>,
    rate_limiter: SmppRateLimiter,
}

/// A connection checked out of the pool, returned automatically on drop
/// per the pool's return policy (disposed if no longer bound).
pub struct Checkout<'a> {
    pool: &'a SmppPool,
    connection: Option<SmppConnection>,
    _permit: OwnedSemaphorePermit,
}

impl<'a> std::ops::Deref for Checkout<'a> {
    type Target = SmppConnection;
    fn deref(&self) -> &SmppConnection {
        self.connection.as_ref().expect("connection present until drop")
    }
}

impl<'a> std::ops::DerefMut for Checkout<'a> {
    fn deref_mut(&mut self) -> &mut SmppConnection {
        self.connection.as_mut().expect("connection present until drop")
    }
}

impl<'a> Drop for Checkout<'a> {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.take() {
            if conn.is_bound() {
                // Synchronous re-enqueue: `try_lock` never contends in
                // practice since the idle queue is only briefly held.
                if let Ok(mut idle) = self.pool.idle.try_lock() {
                    idle.push_back(conn);
                }
            }
        }
    }
}

impl SmppPool {
    pub async fn new(
        config: SmppChannelConfig,
        correlator: Arc<DlrCorrelator>,
        dlr_hook: Option<DlrHook>,
    ) -> Result<Self, SmppError> {
        let pool = Self {
            semaphore: Arc::new(Semaphore::new(config.pool.max_connections)),
            idle: Mutex::new(VecDeque::new()),
            rate_limiter: SmppRateLimiter::new(&config.rate),
            correlator,
            dlr_hook,
            config,
        };

        let warm = pool.config.pool.min_connections.min(pool.config.pool.max_connections);
        for _ in 0..warm {
            match connect_and_bind(&pool.config, Arc::clone(&pool.correlator), pool.dlr_hook.clone()).await {
                Ok(conn) => pool.idle.lock().await.push_back(conn),
                Err(_) => break,
            }
        }
        Ok(pool)
    }

    /// Acquires a bound connection, creating one if the pool is under
    /// capacity or waiting (bounded by `ConnectionTimeout`) for one to be
    /// returned.
    pub async fn acquire(&self) -> Result<Checkout<'_>, SmppError> {
        let permit = tokio::time::timeout(
            self.config.pool.connect_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await
        .map_err(|_| SmppError::PoolExhausted)?
        .map_err(|_| SmppError::Closed)?;

        loop {
            let popped = self.idle.lock().await.pop_front();
            match popped {
                Some(conn) if conn.is_bound() => {
                    return Ok(Checkout {
                        pool: self,
                        connection: Some(conn),
                        _permit: permit,
                    });
                }
                Some(_unbound) => continue,
                None => break,
            }
        }

        let connection = self.connect_with_backoff().await?;
        Ok(Checkout {
            pool: self,
            connection: Some(connection),
            _permit: permit,
        })
    }

    /// Gate shared by every send on this tenant's pool, independent of how
    /// many connections are open.
    pub fn rate_limiter(&self) -> &SmppRateLimiter {
        &self.rate_limiter
    }

    async fn connect_with_backoff(&self) -> Result<SmppConnection, SmppError> {
        let policy = ReconnectPolicy::exponential(
            Duration::from_secs(self.config.pool.recovery_delay_secs.max(1)),
            Duration::from_secs(self.config.pool.recovery_delay_secs.max(1) * 30),
        );

        let mut attempt = 0;
        loop {
            match connect_and_bind(&self.config, Arc::clone(&self.correlator), self.dlr_hook.clone()).await {
                Ok(conn) => return Ok(conn),
                Err(err) => {
                    let Some(delay) = policy.delay_for_attempt(attempt) else {
                        return Err(err);
                    };
                    if attempt >= 5 {
                        return Err(err);
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    pub fn idle_count(&self) -> usize {
        self.idle.try_lock().map(|q| q.len()).unwrap_or(0)
    }
}
