//! Structured session description
//!
//! A [`SessionDocument`] is the engine's in-memory form of an SDP offer or
//! answer. Media lines keep their position: line `i` of an answer always
//! describes the same stream as line `i` of the offer it answers.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use dring_media_core::{MediaAttribute, MediaDirection, MediaType};

use crate::error::SdpError;
use crate::parser::parse_session_document;

/// ICE type preference of host candidates
const HOST_TYPE_PREFERENCE: u32 = 126;
const LOCAL_PREFERENCE: u32 = 65535;

/// Origin (`o=`) line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub username: String,
    pub session_id: u64,
    /// Incremented every time the owner produces a new document for the session
    pub session_version: u64,
    pub address: IpAddr,
}

/// RTP profile of a media line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportProtocol {
    RtpAvp,
    RtpSavp,
    Other(String),
}

impl TransportProtocol {
    pub fn is_secure(&self) -> bool {
        match self {
            TransportProtocol::RtpAvp => false,
            TransportProtocol::RtpSavp => true,
            TransportProtocol::Other(proto) => proto.contains("SAVP"),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransportProtocol::RtpAvp => "RTP/AVP",
            TransportProtocol::RtpSavp => "RTP/SAVP",
            TransportProtocol::Other(proto) => proto,
        }
    }
}

impl From<&str> for TransportProtocol {
    fn from(value: &str) -> Self {
        match value {
            "RTP/AVP" => TransportProtocol::RtpAvp,
            "RTP/SAVP" => TransportProtocol::RtpSavp,
            other => TransportProtocol::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ICE candidate (`a=candidate:`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub foundation: String,
    pub component: u16,
    pub transport: String,
    pub priority: u32,
    pub address: IpAddr,
    pub port: u16,
    pub kind: String,
}

impl Candidate {
    /// Host candidate with the RFC 5245 recommended priority
    pub fn host(component: u16, address: IpAddr, port: u16) -> Self {
        let component_pref = 256u32.saturating_sub(u32::from(component));
        Self {
            foundation: "1".to_string(),
            component,
            transport: "UDP".to_string(),
            priority: (HOST_TYPE_PREFERENCE << 24) | (LOCAL_PREFERENCE << 8) | component_pref,
            address,
            port,
            kind: "host".to_string(),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} typ {}",
            self.foundation,
            self.component,
            self.transport,
            self.priority,
            self.address,
            self.port,
            self.kind
        )
    }
}

/// Attribute the engine does not interpret but carries along
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "a={}:{}", self.name, value),
            None => write!(f, "a={}", self.name),
        }
    }
}

/// One `m=` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLine {
    pub media_type: MediaType,
    /// `0` marks a rejected or disabled line
    pub port: u16,
    pub protocol: TransportProtocol,
    pub formats: Vec<String>,
    /// Media level `c=` address, overriding the session level one
    pub connection: Option<IpAddr>,
    pub direction: MediaDirection,
    pub label: Option<String>,
    pub rtcp_port: Option<u16>,
    pub candidates: Vec<Candidate>,
    pub attributes: Vec<Attribute>,
}

impl MediaLine {
    /// Line carrying no media, keeping the position of `media_type`
    pub fn rejected(media_type: MediaType, protocol: TransportProtocol, formats: Vec<String>) -> Self {
        Self {
            media_type,
            port: 0,
            protocol,
            formats,
            connection: None,
            direction: MediaDirection::Inactive,
            label: None,
            rtcp_port: None,
            candidates: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Whether the line is held, as advertised by its owner
    pub fn is_holding(&self) -> bool {
        self.port != 0
            && matches!(self.direction, MediaDirection::SendOnly | MediaDirection::Inactive)
    }

    /// First value of a carried attribute
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .and_then(|attr| attr.value.as_deref())
    }
}

/// Offer or answer document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDocument {
    pub origin: Origin,
    pub session_name: String,
    /// Session level `c=` address
    pub connection: Option<IpAddr>,
    pub attributes: Vec<Attribute>,
    pub media: Vec<MediaLine>,
}

impl SessionDocument {
    /// Effective connection address of media line `index`
    pub fn line_address(&self, index: usize) -> Option<IpAddr> {
        let line = self.media.get(index)?;
        line.connection.or(self.connection)
    }

    /// A line is rejected when its port is 0 or no address applies to it
    pub fn is_line_rejected(&self, index: usize) -> bool {
        match self.media.get(index) {
            Some(line) => line.port == 0 || self.line_address(index).is_none(),
            None => true,
        }
    }

    pub fn media_types(&self) -> Vec<MediaType> {
        self.media.iter().map(|line| line.media_type).collect()
    }

    /// Rebuild the intent of the document's owner from its media lines.
    ///
    /// Muted and held flags are recovered by inverting the initial direction
    /// truth table. For an answer the direction already folds in the offer,
    /// so the result is the answerer's effective, not raw, intent.
    pub fn media_attributes(&self) -> Vec<MediaAttribute> {
        self.media
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let enabled = !self.is_line_rejected(index);
                let (muted, on_hold) = match line.direction {
                    MediaDirection::SendRecv => (false, false),
                    MediaDirection::RecvOnly => (true, false),
                    MediaDirection::SendOnly => (false, true),
                    MediaDirection::Inactive => (enabled, enabled),
                };
                MediaAttribute {
                    media_type: line.media_type,
                    label: line.label.clone().unwrap_or_default(),
                    enabled,
                    muted,
                    on_hold,
                    secure: line.protocol.is_secure(),
                    source_uri: String::new(),
                }
            })
            .collect()
    }
}

impl FromStr for SessionDocument {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_session_document(s)
    }
}

fn write_connection(f: &mut fmt::Formatter<'_>, address: &IpAddr) -> fmt::Result {
    let addr_type = if address.is_ipv4() { "IP4" } else { "IP6" };
    write!(f, "c=IN {} {}\r\n", addr_type, address)
}

impl fmt::Display for SessionDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin_type = if self.origin.address.is_ipv4() { "IP4" } else { "IP6" };
        write!(f, "v=0\r\n")?;
        write!(
            f,
            "o={} {} {} IN {} {}\r\n",
            self.origin.username,
            self.origin.session_id,
            self.origin.session_version,
            origin_type,
            self.origin.address
        )?;
        write!(f, "s={}\r\n", self.session_name)?;
        if let Some(address) = &self.connection {
            write_connection(f, address)?;
        }
        write!(f, "t=0 0\r\n")?;
        for attr in &self.attributes {
            write!(f, "{}\r\n", attr)?;
        }

        for line in &self.media {
            write!(f, "m={} {} {}", line.media_type, line.port, line.protocol)?;
            for format in &line.formats {
                write!(f, " {}", format)?;
            }
            write!(f, "\r\n")?;
            if let Some(address) = &line.connection {
                write_connection(f, address)?;
            }
            if let Some(rtcp) = line.rtcp_port {
                write!(f, "a=rtcp:{}\r\n", rtcp)?;
            }
            if let Some(label) = &line.label {
                write!(f, "a=label:{}\r\n", label)?;
            }
            for candidate in &line.candidates {
                write!(f, "a=candidate:{}\r\n", candidate)?;
            }
            for attr in &line.attributes {
                write!(f, "{}\r\n", attr)?;
            }
            write!(f, "a={}\r\n", line.direction)?;
        }
        Ok(())
    }
}
