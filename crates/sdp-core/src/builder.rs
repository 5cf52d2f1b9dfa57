//! Offer and answer composition
//!
//! An answer always has exactly one media line per offered line, with the
//! same media type at each position. Lines the answerer cannot or will not
//! carry are kept with port 0.

use std::net::IpAddr;

use dring_media_core::direction::{infer_initial_direction, infer_negotiated_direction};
use dring_media_core::{MediaAttribute, MediaDirection, MediaType};
use tracing::{debug, warn};

use crate::document::{Attribute, Candidate, MediaLine, Origin, SessionDocument, TransportProtocol};
use crate::error::{Result, SdpError};

/// Local transport reserved for one media line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSlot {
    pub address: IpAddr,
    pub rtp_port: u16,
    pub rtcp_port: u16,
}

impl TransportSlot {
    /// Slot using the RTP port + 1 convention for RTCP
    pub fn new(address: IpAddr, rtp_port: u16) -> Self {
        Self {
            address,
            rtp_port,
            rtcp_port: rtp_port.saturating_add(1),
        }
    }
}

/// Builds the local documents of one call
#[derive(Debug, Clone)]
pub struct SdpBuilder {
    username: String,
    session_id: u64,
    session_version: u64,
    address: IpAddr,
    srtp_enabled: bool,
    ice_rfc5245_compliant: bool,
}

impl SdpBuilder {
    pub fn new(username: impl Into<String>, session_id: u64, address: IpAddr) -> Self {
        Self {
            username: username.into(),
            session_id,
            session_version: 1,
            address,
            srtp_enabled: false,
            ice_rfc5245_compliant: true,
        }
    }

    /// Offer secure lines with `RTP/SAVP`, and accept offered secure lines
    pub fn with_srtp(mut self, enabled: bool) -> Self {
        self.srtp_enabled = enabled;
        self
    }

    /// Number ICE components 1/2 per media section. When disabled component
    /// ids keep increasing across sections (legacy behaviour).
    pub fn with_ice_rfc5245_compliance(mut self, compliant: bool) -> Self {
        self.ice_rfc5245_compliant = compliant;
        self
    }

    pub fn with_session_version(mut self, version: u64) -> Self {
        self.session_version = version;
        self
    }

    pub fn session_version(&self) -> u64 {
        self.session_version
    }

    /// Build an offer with one media line per attribute
    pub fn build_offer(&self, attrs: &[MediaAttribute], slots: &[TransportSlot]) -> Result<SessionDocument> {
        let mut media = Vec::with_capacity(attrs.len());
        for (index, attr) in attrs.iter().enumerate() {
            let protocol = if attr.secure && self.srtp_enabled {
                TransportProtocol::RtpSavp
            } else {
                TransportProtocol::RtpAvp
            };
            let (formats, rtpmaps) = default_formats(attr.media_type);

            if !attr.enabled {
                let mut line = MediaLine::rejected(attr.media_type, protocol, formats);
                line.label = label_of(attr);
                media.push(line);
                continue;
            }

            let slot = slots.get(index).ok_or(SdpError::MissingTransport { index })?;
            media.push(self.live_line(
                index,
                attr,
                slot,
                protocol,
                formats,
                rtpmaps,
                infer_initial_direction(attr),
            ));
        }

        debug!(
            "Built offer v{} with {} media line(s)",
            self.session_version,
            media.len()
        );
        Ok(self.document(media))
    }

    /// Build the answer to `offer`.
    ///
    /// `attrs` must hold one attribute per offered line, with matching media
    /// types. Any other shape is a caller bug and fails with
    /// [`SdpError::AnswerMediaCount`] or [`SdpError::AnswerMediaType`].
    pub fn build_answer(
        &self,
        offer: &SessionDocument,
        attrs: &[MediaAttribute],
        slots: &[TransportSlot],
    ) -> Result<SessionDocument> {
        if attrs.len() != offer.media.len() {
            return Err(SdpError::AnswerMediaCount {
                offer: offer.media.len(),
                answer: attrs.len(),
            });
        }
        for (index, (offered, attr)) in offer.media.iter().zip(attrs).enumerate() {
            if offered.media_type != attr.media_type {
                return Err(SdpError::AnswerMediaType {
                    index,
                    offer: offered.media_type,
                    answer: attr.media_type,
                });
            }
        }

        let mut media = Vec::with_capacity(attrs.len());
        for (index, (offered, attr)) in offer.media.iter().zip(attrs).enumerate() {
            let protocol = offered.protocol.clone();
            let formats = offered.formats.clone();

            let refuse_secure = protocol.is_secure() && !self.srtp_enabled;
            if refuse_secure {
                warn!(
                    "Rejecting secure {} media @ index {}: SRTP is disabled for this account",
                    offered.media_type, index
                );
            }

            if offer.is_line_rejected(index) || !attr.enabled || refuse_secure {
                let mut line = MediaLine::rejected(attr.media_type, protocol, formats);
                line.label = label_of(attr);
                media.push(line);
                continue;
            }

            let slot = slots.get(index).ok_or(SdpError::MissingTransport { index })?;
            let rtpmaps = offered
                .attributes
                .iter()
                .filter(|a| a.name == "rtpmap" || a.name == "fmtp")
                .cloned()
                .collect();
            let direction = infer_negotiated_direction(infer_initial_direction(attr), offered.direction);
            media.push(self.live_line(index, attr, slot, protocol, formats, rtpmaps, direction));
        }

        debug!(
            "Built answer v{} to offer v{} from {}",
            self.session_version, offer.origin.session_version, offer.origin.username
        );
        Ok(self.document(media))
    }

    #[allow(clippy::too_many_arguments)]
    fn live_line(
        &self,
        index: usize,
        attr: &MediaAttribute,
        slot: &TransportSlot,
        protocol: TransportProtocol,
        formats: Vec<String>,
        attributes: Vec<Attribute>,
        direction: MediaDirection,
    ) -> MediaLine {
        let (rtp_component, rtcp_component) = if self.ice_rfc5245_compliant {
            (1, 2)
        } else {
            let base = (index as u16).saturating_mul(2);
            (base.saturating_add(1), base.saturating_add(2))
        };

        MediaLine {
            media_type: attr.media_type,
            port: slot.rtp_port,
            protocol,
            formats,
            connection: Some(slot.address),
            direction,
            label: label_of(attr),
            rtcp_port: Some(slot.rtcp_port),
            candidates: vec![
                Candidate::host(rtp_component, slot.address, slot.rtp_port),
                Candidate::host(rtcp_component, slot.address, slot.rtcp_port),
            ],
            attributes,
        }
    }

    fn document(&self, media: Vec<MediaLine>) -> SessionDocument {
        SessionDocument {
            origin: Origin {
                username: self.username.clone(),
                session_id: self.session_id,
                session_version: self.session_version,
                address: self.address,
            },
            session_name: "-".to_string(),
            connection: Some(self.address),
            attributes: Vec::new(),
            media,
        }
    }
}

fn label_of(attr: &MediaAttribute) -> Option<String> {
    if attr.label.is_empty() {
        None
    } else {
        Some(attr.label.clone())
    }
}

/// Payload formats offered for a media type
fn default_formats(media_type: MediaType) -> (Vec<String>, Vec<Attribute>) {
    match media_type {
        MediaType::Audio => (
            vec!["0".to_string(), "8".to_string(), "101".to_string()],
            vec![
                Attribute::new("rtpmap", "0 PCMU/8000"),
                Attribute::new("rtpmap", "8 PCMA/8000"),
                Attribute::new("rtpmap", "101 telephone-event/8000"),
            ],
        ),
        MediaType::Video => (
            vec!["96".to_string()],
            vec![
                Attribute::new("rtpmap", "96 H264/90000"),
                Attribute::new("fmtp", "96 profile-level-id=42e01f"),
            ],
        ),
    }
}
