//! Media direction resolver
//!
//! Pure functions inferring the direction of a media line. Every component
//! that needs a negotiated direction (SDP builder, hold/resume, renegotiation)
//! goes through [`infer_negotiated_direction`] instead of deriving it ad hoc.
//!
//! Directions are encoded as a 2-bit set relative to the local endpoint.
//! A remote direction is encoded with its send and receive bits swapped, so a
//! plain AND of the two sets yields the negotiated direction.

use crate::attribute::MediaAttribute;
use crate::types::MediaDirection;

/// Direction an endpoint advertises for a stream before seeing the peer.
///
/// | enabled | muted | on hold | direction |
/// |---------|-------|---------|-----------|
/// | no      | -     | -       | inactive  |
/// | yes     | yes   | yes     | inactive  |
/// | yes     | yes   | no      | recvonly  |
/// | yes     | no    | yes     | sendonly  |
/// | yes     | no    | no      | sendrecv  |
pub fn infer_initial_direction(attr: &MediaAttribute) -> MediaDirection {
    if !attr.enabled {
        return MediaDirection::Inactive;
    }

    if attr.muted {
        if attr.on_hold {
            return MediaDirection::Inactive;
        }
        return MediaDirection::RecvOnly;
    }

    if attr.on_hold {
        return MediaDirection::SendOnly;
    }

    MediaDirection::SendRecv
}

/// Encode a direction as a bitset relative to the local endpoint
pub fn direction_to_bitset(direction: MediaDirection, is_local: bool) -> u8 {
    match direction {
        MediaDirection::SendRecv => 3,
        MediaDirection::RecvOnly => {
            if is_local {
                2
            } else {
                1
            }
        }
        MediaDirection::SendOnly => {
            if is_local {
                1
            } else {
                2
            }
        }
        MediaDirection::Inactive => 0,
    }
}

pub fn bitset_to_direction(bits: u8) -> MediaDirection {
    match bits & 0b11 {
        3 => MediaDirection::SendRecv,
        2 => MediaDirection::RecvOnly,
        1 => MediaDirection::SendOnly,
        _ => MediaDirection::Inactive,
    }
}

/// Negotiated direction of a line, seen from the local endpoint, given the
/// local and the remote advertised directions.
pub fn infer_negotiated_direction(local: MediaDirection, remote: MediaDirection) -> MediaDirection {
    bitset_to_direction(direction_to_bitset(local, true) & direction_to_bitset(remote, false))
}
