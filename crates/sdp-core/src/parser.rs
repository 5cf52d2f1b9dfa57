//! Parsing of received session descriptions
//!
//! Line level syntax uses `nom`. Unknown line types and attributes are carried
//! or skipped, but a malformed `m=` line or a media kind the engine cannot pair
//! positionally fails the whole document.

use std::net::IpAddr;

use dring_media_core::{MediaDirection, MediaType};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_till1, take_while1},
    character::complete::{anychar, char, digit1, not_line_ending, space1},
    combinator::{map_res, opt, rest},
    multi::many0,
    sequence::{preceded, tuple},
};
use tracing::{debug, warn};

use crate::document::{Attribute, Candidate, MediaLine, Origin, SessionDocument, TransportProtocol};
use crate::error::{Result, SdpError};

/// Parse an SDP line into its type character and value
pub fn parse_sdp_line(input: &str) -> IResult<&str, (char, &str)> {
    let (input, key) = anychar(input)?;
    let (input, _) = char('=')(input)?;
    let (input, value) = not_line_ending(input)?;
    Ok((input, (key, value.trim())))
}

fn token(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c == ' ')(input)
}

fn number<T: std::str::FromStr>(input: &str) -> IResult<&str, T> {
    map_res(digit1, str::parse::<T>)(input)
}

fn address(input: &str) -> IResult<&str, IpAddr> {
    // Multicast TTL and count suffixes are not used by the engine
    map_res(take_while1(|c: char| c != ' ' && c != '/'), str::parse::<IpAddr>)(input)
}

fn network_address(input: &str) -> IResult<&str, IpAddr> {
    let (input, _) = tuple((tag("IN"), space1, alt((tag("IP4"), tag("IP6"))), space1))(input)?;
    address(input)
}

/// `<username> <sess-id> <sess-version> IN <addrtype> <address>`
fn origin(input: &str) -> IResult<&str, Origin> {
    let (input, (username, _, session_id, _, session_version, _, address)) = tuple((
        token,
        space1,
        number::<u64>,
        space1,
        number::<u64>,
        space1,
        network_address,
    ))(input)?;
    Ok((
        input,
        Origin {
            username: username.to_string(),
            session_id,
            session_version,
            address,
        },
    ))
}

/// `<media> <port>[/<count>] <proto> <fmt> ...`
fn media_header(input: &str) -> IResult<&str, (&str, u16, &str, Vec<&str>)> {
    let (input, (media, _, port, _, _, proto, formats)) = tuple((
        token,
        space1,
        number::<u16>,
        opt(preceded(char('/'), digit1)),
        space1,
        token,
        many0(preceded(space1, token)),
    ))(input)?;
    Ok((input, (media, port, proto, formats)))
}

/// `<foundation> <component> <transport> <priority> <address> <port> typ <type> ...`
fn candidate(input: &str) -> IResult<&str, Candidate> {
    let (input, (foundation, _, component, _, transport, _, priority, _, address, _, port)) =
        tuple((
            token,
            space1,
            number::<u16>,
            space1,
            token,
            space1,
            number::<u32>,
            space1,
            address,
            space1,
            number::<u16>,
        ))(input)?;
    let (input, (_, _, _, kind, _)) = tuple((space1, tag("typ"), space1, token, rest))(input)?;
    Ok((
        input,
        Candidate {
            foundation: foundation.to_string(),
            component,
            transport: transport.to_string(),
            priority,
            address,
            port,
            kind: kind.to_string(),
        },
    ))
}

fn split_attribute(value: &str) -> (&str, Option<&str>) {
    match value.split_once(':') {
        Some((name, value)) => (name, Some(value)),
        None => (value, None),
    }
}

fn complete<'a, T>(
    line_no: usize,
    what: &str,
    value: &'a str,
    parser: impl FnOnce(&'a str) -> IResult<&'a str, T>,
) -> Result<T> {
    match parser(value) {
        Ok((remaining, parsed)) if remaining.trim().is_empty() => Ok(parsed),
        Ok((remaining, _)) => Err(SdpError::parse(
            line_no,
            format!("trailing content in {}: {}", what, remaining),
        )),
        Err(e) => Err(SdpError::parse(line_no, format!("invalid {}: {} ({})", what, value, e))),
    }
}

fn parse_media_line(line_no: usize, value: &str) -> Result<MediaLine> {
    let (media, port, proto, formats) = complete(line_no, "media line", value, media_header)?;
    let media_type = media.parse::<MediaType>().map_err(|_| SdpError::UnsupportedMedia {
        line: line_no,
        media: media.to_string(),
    })?;
    if formats.is_empty() {
        return Err(SdpError::parse(line_no, "media line without any format"));
    }

    Ok(MediaLine {
        media_type,
        port,
        protocol: TransportProtocol::from(proto),
        formats: formats.into_iter().map(str::to_string).collect(),
        connection: None,
        // RFC 4566 default
        direction: MediaDirection::SendRecv,
        label: None,
        rtcp_port: None,
        candidates: Vec::new(),
        attributes: Vec::new(),
    })
}

/// Parse a complete session description
pub fn parse_session_document(input: &str) -> Result<SessionDocument> {
    let mut version_seen = false;
    let mut origin_line: Option<Origin> = None;
    let mut session_name = String::new();
    let mut connection = None;
    let mut session_attributes = Vec::new();
    let mut session_direction = None;
    let mut media: Vec<MediaLine> = Vec::new();
    // Whether each media line carried its own direction attribute
    let mut explicit_direction: Vec<bool> = Vec::new();

    for (index, raw) in input.lines().enumerate() {
        let line_no = index + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let (key, value) = complete(line_no, "line", raw, parse_sdp_line)?;

        match key {
            'v' => {
                if value != "0" {
                    return Err(SdpError::parse(line_no, format!("unsupported version {}", value)));
                }
                version_seen = true;
            }
            'o' => origin_line = Some(complete(line_no, "origin", value, origin)?),
            's' => session_name = value.to_string(),
            'c' => {
                let address = complete(line_no, "connection", value, network_address)?;
                match media.last_mut() {
                    Some(line) => line.connection = Some(address),
                    None => connection = Some(address),
                }
            }
            'm' => {
                media.push(parse_media_line(line_no, value)?);
                explicit_direction.push(false);
            }
            'a' => {
                let (name, attr_value) = split_attribute(value);
                let direction = name.parse::<MediaDirection>().ok().filter(|_| attr_value.is_none());

                let Some(line) = media.last_mut() else {
                    match direction {
                        Some(direction) => session_direction = Some(direction),
                        None => session_attributes.push(Attribute {
                            name: name.to_string(),
                            value: attr_value.map(str::to_string),
                        }),
                    }
                    continue;
                };

                if let Some(direction) = direction {
                    line.direction = direction;
                    if let Some(explicit) = explicit_direction.last_mut() {
                        *explicit = true;
                    }
                    continue;
                }

                match (name, attr_value) {
                    ("rtcp", Some(v)) => {
                        let port = v.split_whitespace().next().and_then(|p| p.parse::<u16>().ok());
                        if port.is_none() {
                            warn!("Ignoring malformed rtcp attribute at line {}: {}", line_no, v);
                        }
                        line.rtcp_port = port;
                    }
                    ("label", Some(v)) => line.label = Some(v.to_string()),
                    ("candidate", Some(v)) => match candidate(v) {
                        Ok((_, parsed)) => line.candidates.push(parsed),
                        Err(e) => {
                            warn!("Ignoring malformed candidate at line {}: {}", line_no, e);
                        }
                    },
                    _ => line.attributes.push(Attribute {
                        name: name.to_string(),
                        value: attr_value.map(str::to_string),
                    }),
                }
            }
            't' | 'b' | 'i' | 'u' | 'e' | 'p' | 'r' | 'z' | 'k' => {
                debug!("Skipping SDP line type '{}'", key);
            }
            other => {
                debug!("Skipping unknown SDP line type '{}' at line {}", other, line_no);
            }
        }
    }

    if !version_seen {
        return Err(SdpError::MissingField("v="));
    }
    let origin = origin_line.ok_or(SdpError::MissingField("o="))?;

    if let Some(direction) = session_direction {
        for (line, explicit) in media.iter_mut().zip(explicit_direction) {
            if !explicit {
                line.direction = direction;
            }
        }
    }

    Ok(SessionDocument {
        origin,
        session_name,
        connection,
        attributes: session_attributes,
        media,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const OFFER: &str = "v=0\r\n\
        o=alice 2890844526 2 IN IP4 10.0.0.1\r\n\
        s=-\r\n\
        c=IN IP4 10.0.0.1\r\n\
        t=0 0\r\n\
        m=audio 49170 RTP/SAVP 0 8\r\n\
        a=rtcp:49171\r\n\
        a=label:audio_0\r\n\
        a=candidate:1 1 UDP 2130706431 10.0.0.1 49170 typ host\r\n\
        a=rtpmap:0 PCMU/8000\r\n\
        a=sendrecv\r\n\
        m=video 0 RTP/AVP 96\r\n\
        a=inactive\r\n";

    #[test]
    fn test_parse_sdp_line() {
        let (_, (key, value)) = parse_sdp_line("a=rtpmap:96 VP8/90000").unwrap();
        assert_eq!(key, 'a');
        assert_eq!(value, "rtpmap:96 VP8/90000");
    }

    #[test]
    fn test_parse_full_document() {
        let doc = parse_session_document(OFFER).unwrap();

        assert_eq!(doc.origin.username, "alice");
        assert_eq!(doc.origin.session_version, 2);
        assert_eq!(doc.connection, Some("10.0.0.1".parse().unwrap()));
        assert_eq!(doc.media.len(), 2);

        let audio = &doc.media[0];
        assert_eq!(audio.media_type, MediaType::Audio);
        assert_eq!(audio.port, 49170);
        assert_eq!(audio.protocol, TransportProtocol::RtpSavp);
        assert_eq!(audio.formats, vec!["0", "8"]);
        assert_eq!(audio.rtcp_port, Some(49171));
        assert_eq!(audio.label.as_deref(), Some("audio_0"));
        assert_eq!(audio.candidates.len(), 1);
        assert_eq!(audio.candidates[0].component, 1);
        assert_eq!(audio.attribute("rtpmap"), Some("0 PCMU/8000"));
        assert_eq!(audio.direction, MediaDirection::SendRecv);

        assert_eq!(doc.media[1].media_type, MediaType::Video);
        assert_eq!(doc.media[1].direction, MediaDirection::Inactive);
        assert!(doc.is_line_rejected(1));
    }

    #[test]
    fn test_missing_direction_defaults_to_sendrecv() {
        let sdp = "v=0\no=- 1 1 IN IP4 10.0.0.1\ns=-\nc=IN IP4 10.0.0.1\nt=0 0\nm=audio 4000 RTP/AVP 0\n";
        let doc = parse_session_document(sdp).unwrap();
        assert_eq!(doc.media[0].direction, MediaDirection::SendRecv);
    }

    #[test]
    fn test_session_direction_applies_to_lines_without_their_own() {
        let sdp = "v=0\r\no=- 1 1 IN IP4 10.0.0.1\r\ns=-\r\nt=0 0\r\na=sendonly\r\n\
                   m=audio 4000 RTP/AVP 0\r\nc=IN IP4 10.0.0.1\r\n\
                   m=video 4002 RTP/AVP 96\r\nc=IN IP4 10.0.0.1\r\na=recvonly\r\n";
        let doc = parse_session_document(sdp).unwrap();
        assert_eq!(doc.media[0].direction, MediaDirection::SendOnly);
        assert_eq!(doc.media[1].direction, MediaDirection::RecvOnly);
        assert_eq!(doc.media[0].connection, Some("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_unknown_media_type_is_rejected() {
        let sdp = "v=0\r\no=- 1 1 IN IP4 10.0.0.1\r\ns=-\r\nt=0 0\r\nm=text 4000 RTP/AVP 98\r\n";
        let err = parse_session_document(sdp).unwrap_err();
        assert_eq!(
            err,
            SdpError::UnsupportedMedia {
                line: 5,
                media: "text".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_media_line_is_rejected() {
        let sdp = "v=0\r\no=- 1 1 IN IP4 10.0.0.1\r\ns=-\r\nt=0 0\r\nm=audio notaport RTP/AVP 0\r\n";
        assert!(matches!(
            parse_session_document(sdp),
            Err(SdpError::Parse { line: 5, .. })
        ));
    }

    #[test]
    fn test_missing_origin() {
        let sdp = "v=0\r\ns=-\r\nt=0 0\r\n";
        assert_eq!(parse_session_document(sdp), Err(SdpError::MissingField("o=")));
    }

    #[test]
    fn test_unknown_attributes_are_carried() {
        let sdp = "v=0\r\no=- 1 1 IN IP6 ::1\r\ns=-\r\nc=IN IP6 ::1\r\nt=0 0\r\n\
                   m=audio 4000 RTP/AVP 0\r\na=ptime:20\r\na=x-custom\r\n";
        let doc = parse_session_document(sdp).unwrap();
        assert_eq!(doc.media[0].attribute("ptime"), Some("20"));
        assert!(doc.media[0].attributes.iter().any(|a| a.name == "x-custom" && a.value.is_none()));
        assert!(doc.connection.map(|a| a.is_ipv6()).unwrap_or(false));
    }
}
