//! Per-stream media intent
//!
//! A [`MediaAttribute`] describes what one endpoint wants for one media line
//! of an offer or an answer. Lists of attributes are what clients hand to the
//! engine when placing, accepting or changing a call, either directly or as
//! string maps ([`MediaMap`]) through [`MediaAttribute::parse_media_list`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MediaError, Result};
use crate::types::MediaType;

/// String map representation of one media attribute used by client APIs
pub type MediaMap = HashMap<String, String>;

/// Keys of a [`MediaMap`]
pub mod keys {
    pub const MEDIA_TYPE: &str = "MEDIA_TYPE";
    pub const ENABLED: &str = "ENABLED";
    pub const MUTED: &str = "MUTED";
    pub const SECURE: &str = "SECURE";
    pub const SOURCE: &str = "SOURCE";
    pub const LABEL: &str = "LABEL";
}

/// Values of a [`MediaMap`]
pub mod values {
    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";
    pub const AUDIO: &str = "MEDIA_TYPE_AUDIO";
    pub const VIDEO: &str = "MEDIA_TYPE_VIDEO";
}

/// Intent of one endpoint for one media line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttribute {
    pub media_type: MediaType,
    /// Opaque identifier of the logical stream, stable across renegotiations
    #[serde(default)]
    pub label: String,
    /// The stream is present at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// The sender does not transmit content even though the stream exists
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub on_hold: bool,
    /// Transport level encryption requested
    #[serde(default = "default_true")]
    pub secure: bool,
    /// Capture source identifier
    #[serde(default)]
    pub source_uri: String,
}

fn default_true() -> bool {
    true
}

impl MediaAttribute {
    pub fn new(media_type: MediaType) -> Self {
        Self {
            media_type,
            label: String::new(),
            enabled: true,
            muted: false,
            on_hold: false,
            secure: true,
            source_uri: String::new(),
        }
    }

    pub fn audio() -> Self {
        Self::new(MediaType::Audio)
    }

    pub fn video() -> Self {
        Self::new(MediaType::Video)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn with_on_hold(mut self, on_hold: bool) -> Self {
        self.on_hold = on_hold;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_source(mut self, source_uri: impl Into<String>) -> Self {
        self.source_uri = source_uri.into();
        self
    }

    /// Whether this stream sends content. Switching the capture source of a
    /// stream that does not needs no renegotiation.
    pub fn is_transmitting(&self) -> bool {
        self.enabled && !self.muted
    }

    /// Copy the negotiable fields of `src`, keeping the media type
    pub fn update_from(&mut self, src: &MediaAttribute) {
        self.enabled = src.enabled;
        self.muted = src.muted;
        self.on_hold = src.on_hold;
        self.secure = src.secure;
        self.source_uri = src.source_uri.clone();
        if !src.label.is_empty() {
            self.label = src.label.clone();
        }
    }

    /// Return true if at least one media in the list has a matching type
    pub fn has_media_type(list: &[MediaAttribute], media_type: MediaType) -> bool {
        list.iter().any(|attr| attr.media_type == media_type)
    }

    /// Give every unlabelled stream a label derived from its type and rank
    /// among streams of the same type (`audio_0`, `video_0`, ...).
    pub fn assign_default_labels(list: &mut [MediaAttribute]) {
        let mut audio = 0;
        let mut video = 0;
        for attr in list.iter_mut() {
            let rank = match attr.media_type {
                MediaType::Audio => {
                    audio += 1;
                    audio - 1
                }
                MediaType::Video => {
                    video += 1;
                    video - 1
                }
            };
            if attr.label.is_empty() {
                attr.label = format!("{}_{}", attr.media_type, rank);
            }
        }
    }

    /// Parse a client media list.
    ///
    /// Missing optional keys keep their default value. The media type is
    /// mandatory, and boolean keys must hold `true` or `false`.
    pub fn parse_media_list(media_list: &[MediaMap]) -> Result<Vec<MediaAttribute>> {
        media_list
            .iter()
            .enumerate()
            .map(|(index, map)| Self::from_media_map(index, map))
            .collect()
    }

    fn from_media_map(index: usize, map: &MediaMap) -> Result<MediaAttribute> {
        let media_type = match map.get(keys::MEDIA_TYPE) {
            Some(value) => string_to_media_type(value)
                .ok_or_else(|| MediaError::invalid_value(index, keys::MEDIA_TYPE, value.as_str()))?,
            None => {
                return Err(MediaError::MissingKey {
                    index,
                    key: keys::MEDIA_TYPE.to_string(),
                });
            }
        };

        let mut attr = MediaAttribute::new(media_type);

        if let Some(secure) = bool_value(map, index, keys::SECURE)? {
            attr.secure = secure;
        }
        if let Some(muted) = bool_value(map, index, keys::MUTED)? {
            attr.muted = muted;
        }
        if let Some(enabled) = bool_value(map, index, keys::ENABLED)? {
            attr.enabled = enabled;
        }
        if let Some(source) = string_value(map, index, keys::SOURCE) {
            attr.source_uri = source;
        }
        if let Some(label) = string_value(map, index, keys::LABEL) {
            attr.label = label;
        }

        Ok(attr)
    }

    /// Serialize to the client map representation
    pub fn to_media_map(&self) -> MediaMap {
        let mut map = MediaMap::new();
        map.insert(
            keys::MEDIA_TYPE.to_string(),
            media_type_to_string(self.media_type).to_string(),
        );
        map.insert(keys::ENABLED.to_string(), bool_to_string(self.enabled).to_string());
        map.insert(keys::MUTED.to_string(), bool_to_string(self.muted).to_string());
        map.insert(keys::SECURE.to_string(), bool_to_string(self.secure).to_string());
        map.insert(keys::SOURCE.to_string(), self.source_uri.clone());
        map.insert(keys::LABEL.to_string(), self.label.clone());
        map
    }

    pub fn to_media_maps(list: &[MediaAttribute]) -> Vec<MediaMap> {
        list.iter().map(MediaAttribute::to_media_map).collect()
    }
}

pub fn media_type_to_string(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Audio => values::AUDIO,
        MediaType::Video => values::VIDEO,
    }
}

pub fn string_to_media_type(value: &str) -> Option<MediaType> {
    match value {
        values::AUDIO => Some(MediaType::Audio),
        values::VIDEO => Some(MediaType::Video),
        _ => None,
    }
}

fn bool_to_string(value: bool) -> &'static str {
    if value { values::TRUE } else { values::FALSE }
}

fn bool_value(map: &MediaMap, index: usize, key: &str) -> Result<Option<bool>> {
    match map.get(key).map(String::as_str) {
        None => {
            warn!("[{}] key not found for media @ index {}", key, index);
            Ok(None)
        }
        Some(values::TRUE) => Ok(Some(true)),
        Some(values::FALSE) => Ok(Some(false)),
        Some(other) => Err(MediaError::invalid_value(index, key, other)),
    }
}

fn string_value(map: &MediaMap, index: usize, key: &str) -> Option<String> {
    let value = map.get(key).cloned();
    if value.is_none() {
        warn!("[{}] key not found for media @ index {}", key, index);
    }
    value
}
