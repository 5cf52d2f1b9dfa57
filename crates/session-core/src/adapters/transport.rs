//! Transport address allocation
//!
//! ICE gathering is outside the engine. A [`TransportProvider`] hands out the
//! local address and RTP/RTCP ports of every media line.

use std::net::IpAddr;

use dring_media_core::MediaType;
use dring_sdp_core::TransportSlot;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errors::{Result, SessionError};
use crate::types::CallId;

pub trait TransportProvider: Send + Sync {
    fn allocate(&self, call_id: &CallId, media_type: MediaType) -> Result<TransportSlot>;

    fn release(&self, call_id: &CallId, slot: &TransportSlot);
}

#[derive(Debug)]
struct PortPool {
    next: u32,
    free: Vec<u16>,
}

/// Hands out even RTP ports (RTCP on the next odd port) from a fixed range
#[derive(Debug)]
pub struct PortRangeTransport {
    address: IpAddr,
    start: u16,
    end: u16,
    pool: Mutex<PortPool>,
}

impl PortRangeTransport {
    pub fn new(address: IpAddr, start: u16, end: u16) -> Self {
        let first = if start % 2 == 0 { start } else { start.saturating_add(1) };
        Self {
            address,
            start: first,
            end,
            pool: Mutex::new(PortPool {
                next: u32::from(first),
                free: Vec::new(),
            }),
        }
    }

    pub fn available(&self) -> usize {
        let pool = self.pool.lock();
        let fresh = (u32::from(self.end) + 1).saturating_sub(pool.next) / 2;
        pool.free.len() + fresh as usize
    }
}

impl TransportProvider for PortRangeTransport {
    fn allocate(&self, call_id: &CallId, media_type: MediaType) -> Result<TransportSlot> {
        let mut pool = self.pool.lock();

        let port = match pool.free.pop() {
            Some(port) => port,
            None => {
                if pool.next + 1 > u32::from(self.end) {
                    warn!("[{}] no media port left in {}-{}", call_id, self.start, self.end);
                    return Err(SessionError::ResourceExhausted(format!(
                        "media ports {}-{}",
                        self.start, self.end
                    )));
                }
                let port = pool.next as u16;
                pool.next += 2;
                port
            }
        };

        debug!("[{}] allocated {} port {}", call_id, media_type, port);
        Ok(TransportSlot::new(self.address, port))
    }

    fn release(&self, call_id: &CallId, slot: &TransportSlot) {
        if slot.rtp_port < self.start || slot.rtp_port > self.end {
            return;
        }
        debug!("[{}] released port {}", call_id, slot.rtp_port);
        self.pool.lock().free.push(slot.rtp_port);
    }
}
