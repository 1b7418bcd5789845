// Venturi - a GDL90 traffic and navigation aggregator
// Copyright (C) 2026  Venturi Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! UDP broadcast egress for GDL90 messages.
//!
//! The port owns a socket bound to the broadcast address of one network
//! interface. Binding to the broadcast address makes the socket receive
//! its own datagrams; a receive timeout therefore means the socket went
//! stale (interface flap, address change) and the port recreates it.
//!
//! A single event loop owns the state; the initializer, sender and
//! receiver run as worker threads reporting back over the event
//! channel.

use std::collections::VecDeque;
use std::io;
use std::net::{Ipv4Addr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nix::ifaddrs::getifaddrs;

use crate::protocol::gdl90::{
    encode_heartbeat, encode_ownship, encode_ownship_geo_altitude, encode_traffic, Gdl90Error,
};
use crate::protocol::Gdl90Message;

const QUEUE_SIZE: usize = 1000;
const RECV_BUFFER_SIZE: usize = 1000;
const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const QUEUE_GET_TIMEOUT: Duration = Duration::from_secs(3);
const INIT_RETRY_DELAY: Duration = Duration::from_secs(5);

enum PortEvent {
    InitComplete(UdpSocket),
    RecvFailure,
}

#[derive(Debug, PartialEq)]
enum PortState {
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy)]
struct PortAddrs {
    ip: Ipv4Addr,
    net_mask: Ipv4Addr,
    broadcast_ip: Ipv4Addr,
}

/// UDP broadcast endpoint with a bounded send queue. Survives interface
/// flaps by rebuilding the socket from the interface's current address.
pub struct Gdl90Port {
    nic: String,
    port: u16,
    queue: BoundedQueue,
    event_tx: SyncSender<PortEvent>,
    event_rx: Mutex<Option<Receiver<PortEvent>>>,
    active: AtomicBool,
    stop: AtomicBool,
    addrs: Mutex<Option<PortAddrs>>,
}

impl Gdl90Port {
    pub fn new(nic: &str, port: u16) -> Arc<Self> {
        let (event_tx, event_rx) = mpsc::sync_channel(3);
        Arc::new(Gdl90Port {
            nic: nic.to_string(),
            port,
            queue: BoundedQueue::new(QUEUE_SIZE),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            active: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            addrs: Mutex::new(None),
        })
    }

    /// Whether the port is actively sending.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn nic(&self) -> &str {
        &self.nic
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.current_addrs().map(|a| a.ip)
    }

    pub fn net_mask(&self) -> Option<Ipv4Addr> {
        self.current_addrs().map(|a| a.net_mask)
    }

    pub fn broadcast_ip(&self) -> Option<Ipv4Addr> {
        self.current_addrs().map(|a| a.broadcast_ip)
    }

    fn current_addrs(&self) -> Option<PortAddrs> {
        if self.is_active() {
            *self.addrs.lock().unwrap()
        } else {
            None
        }
    }

    /// Queue a message for sending. Messages are dropped while the port
    /// is inactive and when the queue is full.
    pub fn put_message(&self, msg: Gdl90Message) {
        if !self.is_active() {
            debug!("gdl90 port inactive, drop message");
            return;
        }
        if self.queue.try_put(msg).is_err() {
            error!(
                "gdl90 send queue full (maxsize={}), drop message",
                QUEUE_SIZE
            );
        }
    }

    /// Run the port event loop. Blocking; owns all state transitions.
    pub fn exec(self: &Arc<Self>) {
        let event_rx = match self.event_rx.lock().unwrap().take() {
            Some(rx) => rx,
            None => {
                error!("gdl90 port is already executing");
                return;
            }
        };

        let mut state = PortState::Inactive;
        let mut init_thread = Some(self.spawn_initializer());
        let mut sender_thread: Option<JoinHandle<()>> = None;
        let mut recv_thread: Option<JoinHandle<()>> = None;

        while let Ok(event) = event_rx.recv() {
            match event {
                PortEvent::InitComplete(socket) if state == PortState::Inactive => {
                    if let Some(thread) = init_thread.take() {
                        let _ = thread.join();
                    }
                    let send_socket = match socket.try_clone() {
                        Ok(send_socket) => send_socket,
                        Err(e) => {
                            error!("could not clone gdl90 socket, {}", e);
                            init_thread = Some(self.spawn_initializer());
                            continue;
                        }
                    };
                    state = PortState::Active;
                    info!("entered active state");
                    self.stop.store(false, Ordering::SeqCst);
                    self.active.store(true, Ordering::SeqCst);
                    sender_thread = Some(self.spawn_sender(send_socket));
                    recv_thread = Some(self.spawn_receiver(socket));
                }
                PortEvent::RecvFailure if state == PortState::Active => {
                    state = PortState::Inactive;
                    info!("entered inactive state");
                    self.active.store(false, Ordering::SeqCst);
                    self.stop.store(true, Ordering::SeqCst);
                    if let Some(thread) = sender_thread.take() {
                        let _ = thread.join();
                    }
                    if let Some(thread) = recv_thread.take() {
                        let _ = thread.join();
                    }
                    init_thread = Some(self.spawn_initializer());
                }
                _ => {}
            }
        }
    }

    fn spawn_initializer(self: &Arc<Self>) -> JoinHandle<()> {
        let port = Arc::clone(self);
        thread::spawn(move || {
            let mut failure_reported = false;
            loop {
                match init_socket(&port.nic, port.port) {
                    Ok((socket, addrs)) => {
                        info!(
                            "send gdl90 messages to {} (iface: {}, ip: {}/{})",
                            addrs.broadcast_ip, port.nic, addrs.ip, addrs.net_mask
                        );
                        *port.addrs.lock().unwrap() = Some(addrs);
                        if port.event_tx.send(PortEvent::InitComplete(socket)).is_err() {
                            warn!("gdl90 event loop gone, stop initializer");
                        }
                        break;
                    }
                    Err(e) => {
                        if !failure_reported {
                            error!("gdl90 udp socket init failure, {}", e);
                            failure_reported = true;
                        }
                        thread::sleep(INIT_RETRY_DELAY);
                    }
                }
            }
        })
    }

    fn spawn_sender(self: &Arc<Self>, socket: UdpSocket) -> JoinHandle<()> {
        let port = Arc::clone(self);
        thread::spawn(move || {
            let destination = match *port.addrs.lock().unwrap() {
                Some(addrs) => (addrs.broadcast_ip, port.port),
                None => {
                    error!("gdl90 sender started without an address");
                    return;
                }
            };
            loop {
                if let Some(msg) = port.queue.get_timeout(QUEUE_GET_TIMEOUT) {
                    match encode_message(&msg) {
                        Ok(bytes) => {
                            if let Err(e) = socket.send_to(&bytes, destination) {
                                error!("error sending gdl90 message, {}", e);
                            }
                        }
                        Err(e) => error!("error encoding gdl90 message, {}", e),
                    }
                }
                if port.stop.load(Ordering::SeqCst) {
                    break;
                }
            }
        })
    }

    fn spawn_receiver(self: &Arc<Self>, socket: UdpSocket) -> JoinHandle<()> {
        let port = Arc::clone(self);
        thread::spawn(move || {
            let mut buf = [0u8; RECV_BUFFER_SIZE];
            loop {
                match socket.recv(&mut buf) {
                    Ok(0) => {
                        error!("detected problem with socket, zero length receive, recreate socket...");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("detected problem with socket \"{}\", recreate socket...", e);
                        break;
                    }
                }
            }
            let _ = port.event_tx.send(PortEvent::RecvFailure);
        })
    }
}

fn encode_message(msg: &Gdl90Message) -> Result<Vec<u8>, Gdl90Error> {
    match msg {
        Gdl90Message::Heartbeat(m) => Ok(encode_heartbeat(m)),
        Gdl90Message::Traffic(m) => encode_traffic(m),
        Gdl90Message::Ownship(m) => encode_ownship(m),
        Gdl90Message::OwnshipGeoAltitude(m) => Ok(encode_ownship_geo_altitude(m)),
    }
}

fn init_socket(nic: &str, port: u16) -> io::Result<(UdpSocket, PortAddrs)> {
    let (ip, net_mask) = interface_addrs(nic)?;
    let broadcast_ip = broadcast_of(ip, net_mask);
    // bound to the broadcast address so our own datagrams come back as
    // the liveness signal
    let socket = UdpSocket::bind((broadcast_ip, port))?;
    socket.set_broadcast(true)?;
    socket.set_read_timeout(Some(RECV_TIMEOUT))?;
    Ok((
        socket,
        PortAddrs {
            ip,
            net_mask,
            broadcast_ip,
        },
    ))
}

fn interface_addrs(nic: &str) -> io::Result<(Ipv4Addr, Ipv4Addr)> {
    let addrs = getifaddrs().map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    for ifaddr in addrs {
        if ifaddr.interface_name != nic {
            continue;
        }
        let (address, netmask) = match (ifaddr.address, ifaddr.netmask) {
            (Some(address), Some(netmask)) => (address, netmask),
            _ => continue,
        };
        if let (Some(sin), Some(sin_mask)) = (address.as_sockaddr_in(), netmask.as_sockaddr_in()) {
            return Ok((Ipv4Addr::from(sin.ip()), Ipv4Addr::from(sin_mask.ip())));
        }
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no ipv4 address on interface {}", nic),
    ))
}

fn broadcast_of(ip: Ipv4Addr, net_mask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(ip) | !u32::from(net_mask))
}

/// FIFO queue that drops new entries when full instead of blocking the
/// producer.
struct BoundedQueue {
    inner: Mutex<VecDeque<Gdl90Message>>,
    available: Condvar,
    capacity: usize,
}

impl BoundedQueue {
    fn new(capacity: usize) -> Self {
        BoundedQueue {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
            capacity,
        }
    }

    fn try_put(&self, msg: Gdl90Message) -> Result<(), Gdl90Message> {
        let mut queue = self.inner.lock().unwrap();
        if queue.len() >= self.capacity {
            return Err(msg);
        }
        queue.push_back(msg);
        self.available.notify_one();
        Ok(())
    }

    fn get_timeout(&self, timeout: Duration) -> Option<Gdl90Message> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.inner.lock().unwrap();
        loop {
            if let Some(msg) = queue.pop_front() {
                return Some(msg);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .available
                .wait_timeout(queue, deadline - now)
                .unwrap();
            queue = guard;
        }
    }
}
