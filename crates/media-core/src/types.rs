//! Media type, direction and negotiated description types

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MediaError;

/// Kind of a media line. Offer and answer lines are paired positionally and
/// must agree on this at every position.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum MediaType {
    Audio,
    Video,
}

impl MediaType {
    /// Token used on the SDP `m=` line
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Audio => "audio",
            MediaType::Video => "video",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(MediaType::Audio),
            "video" => Ok(MediaType::Video),
            other => Err(MediaError::UnknownMediaType(other.to_string())),
        }
    }
}

/// Transmit/receive direction of a media line, always from the point of view
/// of the endpoint holding the value.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum MediaDirection {
    Inactive,
    SendOnly,
    RecvOnly,
    SendRecv,
}

impl MediaDirection {
    /// The same media line seen from the other endpoint
    pub fn transpose(self) -> Self {
        match self {
            MediaDirection::SendOnly => MediaDirection::RecvOnly,
            MediaDirection::RecvOnly => MediaDirection::SendOnly,
            other => other,
        }
    }

    pub fn can_send(self) -> bool {
        matches!(self, MediaDirection::SendOnly | MediaDirection::SendRecv)
    }

    pub fn can_receive(self) -> bool {
        matches!(self, MediaDirection::RecvOnly | MediaDirection::SendRecv)
    }

    /// SDP direction attribute name
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaDirection::Inactive => "inactive",
            MediaDirection::SendOnly => "sendonly",
            MediaDirection::RecvOnly => "recvonly",
            MediaDirection::SendRecv => "sendrecv",
        }
    }
}

impl fmt::Display for MediaDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaDirection {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(MediaDirection::Inactive),
            "sendonly" => Ok(MediaDirection::SendOnly),
            "recvonly" => Ok(MediaDirection::RecvOnly),
            "sendrecv" => Ok(MediaDirection::SendRecv),
            other => Err(MediaError::UnknownDirection(other.to_string())),
        }
    }
}

/// Negotiated RTP media slot.
///
/// A port of `0` or a missing address is the wire convention for a media
/// line that was rejected or disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescription {
    pub media_type: MediaType,
    pub direction: MediaDirection,
    pub address: Option<IpAddr>,
    pub port: u16,
    pub on_hold: bool,
}

impl MediaDescription {
    /// Description of a line that carries no media
    pub fn rejected(media_type: MediaType) -> Self {
        Self {
            media_type,
            direction: MediaDirection::Inactive,
            address: None,
            port: 0,
            on_hold: false,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.port == 0 || self.address.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpose_swaps_only_one_way_directions() {
        assert_eq!(MediaDirection::SendOnly.transpose(), MediaDirection::RecvOnly);
        assert_eq!(MediaDirection::RecvOnly.transpose(), MediaDirection::SendOnly);
        assert_eq!(MediaDirection::SendRecv.transpose(), MediaDirection::SendRecv);
        assert_eq!(MediaDirection::Inactive.transpose(), MediaDirection::Inactive);
    }

    #[test]
    fn test_direction_tokens() {
        for dir in [
            MediaDirection::Inactive,
            MediaDirection::SendOnly,
            MediaDirection::RecvOnly,
            MediaDirection::SendRecv,
        ] {
            assert_eq!(dir.as_str().parse::<MediaDirection>().unwrap(), dir);
        }
        assert!("sendreceive".parse::<MediaDirection>().is_err());
    }

    #[test]
    fn test_rejected_description() {
        let descr = MediaDescription::rejected(MediaType::Video);
        assert!(descr.is_rejected());
        assert_eq!(descr.direction, MediaDirection::Inactive);

        let live = MediaDescription {
            media_type: MediaType::Audio,
            direction: MediaDirection::SendRecv,
            address: Some("10.0.0.1".parse().unwrap()),
            port: 0,
            on_hold: false,
        };
        assert!(live.is_rejected(), "port 0 means rejected even with an address");
    }
}
