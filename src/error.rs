// src/error.rs

use std::fmt;

/// **CDB 远程竞价调用失败的原因**
///
/// 只会交给 `CdbCallListener::on_request_failed`，缓存与 backoff 均不受影响。
#[derive(Debug)]
pub enum CdbError {
    /// 超过 `SenderSettings::timeout`
    Timeout,
    /// 网络层错误（连接、发送、读取 body）
    Http(reqwest::Error),
    /// 非 2xx 响应
    Status(u16),
    /// 响应 JSON 无法解析
    Decode(String),
}

impl fmt::Display for CdbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CdbError::Timeout => write!(f, "cdb call timed out"),
            CdbError::Http(e) => write!(f, "cdb transport error: {}", e),
            CdbError::Status(code) => write!(f, "cdb answered with status {}", code),
            CdbError::Decode(msg) => write!(f, "cdb response is malformed: {}", msg),
        }
    }
}

impl std::error::Error for CdbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CdbError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CdbError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CdbError::Timeout
        } else {
            CdbError::Http(e)
        }
    }
}

impl From<simd_json::Error> for CdbError {
    fn from(e: simd_json::Error) -> Self {
        CdbError::Decode(e.to_string())
    }
}

/// **CDB 返回的 slot 被拒绝缓存的原因**
#[derive(Debug, Clone, PartialEq)]
pub enum SlotError {
    /// cpm 字段不是合法数字
    UnparsableCpm(String),
    NegativeCpm(f64),
    /// 既没有 displayUrl 也没有 native
    MissingPayload,
    InvalidDisplayUrl(String),
    /// cpm = 0 且 ttl = 0
    NoBid,
}

impl fmt::Display for SlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotError::UnparsableCpm(raw) => write!(f, "cpm {:?} is not a number", raw),
            SlotError::NegativeCpm(cpm) => write!(f, "cpm {} is negative", cpm),
            SlotError::MissingPayload => write!(f, "slot has neither display url nor native assets"),
            SlotError::InvalidDisplayUrl(url) => write!(f, "display url {:?} is not well-formed", url),
            SlotError::NoBid => write!(f, "slot is a no-bid"),
        }
    }
}

impl std::error::Error for SlotError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_readable() {
        assert_eq!(CdbError::Status(503).to_string(), "cdb answered with status 503");
        assert_eq!(
            SlotError::UnparsableCpm("abc".into()).to_string(),
            "cpm \"abc\" is not a number"
        );
    }
}
