//! Pick request parsing.
//!
//! Callers pass a loosely typed argument map (JSON object). Missing keys and
//! values of the wrong type fall back to defaults; parsing never fails.

use crate::media::MediaKind;
use serde_json::Value;

/// `maxSize = 0` means unlimited, which is capped at 1 GiB.
pub const MAX_SIZE_UNLIMITED: u64 = 1024 * 1024 * 1024;
pub const DEFAULT_GRID_COUNT: u32 = 4;

/// Which media kinds the picker offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MimeFilter {
    #[default]
    All,
    Image,
    Video,
}

impl MimeFilter {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => MimeFilter::Image,
            2 => MimeFilter::Video,
            _ => MimeFilter::All,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            MimeFilter::All => 0,
            MimeFilter::Image => 1,
            MimeFilter::Video => 2,
        }
    }

    pub fn allows(self, kind: MediaKind) -> bool {
        match self {
            MimeFilter::All => true,
            MimeFilter::Image => kind == MediaKind::Image,
            MimeFilter::Video => kind == MediaKind::Video,
        }
    }
}

/// Picker UI language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    System,
    SimplifiedChinese,
    TraditionalChinese,
    English,
}

impl Language {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Language::SimplifiedChinese,
            2 => Language::TraditionalChinese,
            3 => Language::English,
            _ => Language::System,
        }
    }
}

/// Constraints for one pick session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickRequest {
    pub mime_type: MimeFilter,
    /// At least 1; more than 1 enables multi-select.
    pub max_select_num: u32,
    /// Raw byte cap; 0 = unlimited. See [`PickRequest::effective_max_size`].
    pub max_size: u64,
    /// Raw grid column count; see [`PickRequest::effective_grid_count`].
    pub grid_count: i64,
    /// 0 = unlimited.
    pub max_width: u32,
    pub max_height: u32,
    pub language: Language,
}

impl Default for PickRequest {
    fn default() -> Self {
        Self {
            mime_type: MimeFilter::All,
            max_select_num: 1,
            max_size: 0,
            grid_count: DEFAULT_GRID_COUNT as i64,
            max_width: 0,
            max_height: 0,
            language: Language::System,
        }
    }
}

fn int_arg(args: &Value, key: &str) -> Option<i64> {
    args.get(key).and_then(Value::as_i64)
}

impl PickRequest {
    /// Parse the caller's argument map. Non-objects yield the defaults.
    pub fn from_args(args: &Value) -> Self {
        let defaults = Self::default();
        let non_negative = |key: &str| {
            int_arg(args, key)
                .map(|v| v.clamp(0, u32::MAX as i64) as u32)
                .unwrap_or(0)
        };
        Self {
            mime_type: int_arg(args, "mimeType")
                .map(MimeFilter::from_code)
                .unwrap_or(defaults.mime_type),
            max_select_num: int_arg(args, "maxSelectNum")
                .map(|v| v.clamp(1, u32::MAX as i64) as u32)
                .unwrap_or(defaults.max_select_num),
            max_size: int_arg(args, "maxSize")
                .map(|v| v.max(0) as u64)
                .unwrap_or(defaults.max_size),
            grid_count: int_arg(args, "gridCount").unwrap_or(defaults.grid_count),
            max_width: non_negative("maxWidth"),
            max_height: non_negative("maxHeight"),
            language: int_arg(args, "language")
                .map(Language::from_code)
                .unwrap_or(defaults.language),
        }
    }

    pub fn is_multi_select(&self) -> bool {
        self.max_select_num > 1
    }

    pub fn effective_max_size(&self) -> u64 {
        if self.max_size > 0 {
            self.max_size
        } else {
            MAX_SIZE_UNLIMITED
        }
    }

    pub fn effective_grid_count(&self) -> u32 {
        if self.grid_count > 0 {
            self.grid_count.min(u32::MAX as i64) as u32
        } else {
            DEFAULT_GRID_COUNT
        }
    }
}
