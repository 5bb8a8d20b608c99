//! Business message codes and the caller-facing error built from them.
//!
//! Codes ending in `I` are informational; `E` codes are failures. Anything
//! with a status of 500 or above is private: callers get a generic body while
//! the underlying error is logged server-side.

use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;

/// Response locale. Anything but `ja` falls back to English.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl Locale {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("ja") {
            Locale::Ja
        } else {
            Locale::En
        }
    }
}

/// The message catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageCode {
    /// `00001I`: the requested like state is already recorded.
    AlreadyLiked,
    /// `00001E`
    InvalidHeader,
    /// `00002E`
    InvalidClientId,
    /// `10001E`
    SelectFailed,
    /// `10002E`
    MappingFailed,
    /// `10003E`
    UpdateFailed,
    /// `10004E`
    FavoriteCreateFailed,
    /// `10005E`
    FavoriteDeleteFailed,
}

impl MessageCode {
    pub const ALL: &'static [MessageCode] = &[
        MessageCode::AlreadyLiked,
        MessageCode::InvalidHeader,
        MessageCode::InvalidClientId,
        MessageCode::SelectFailed,
        MessageCode::MappingFailed,
        MessageCode::UpdateFailed,
        MessageCode::FavoriteCreateFailed,
        MessageCode::FavoriteDeleteFailed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageCode::AlreadyLiked => "00001I",
            MessageCode::InvalidHeader => "00001E",
            MessageCode::InvalidClientId => "00002E",
            MessageCode::SelectFailed => "10001E",
            MessageCode::MappingFailed => "10002E",
            MessageCode::UpdateFailed => "10003E",
            MessageCode::FavoriteCreateFailed => "10004E",
            MessageCode::FavoriteDeleteFailed => "10005E",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == code)
    }

    pub fn status(self) -> u16 {
        match self {
            MessageCode::AlreadyLiked => 200,
            MessageCode::InvalidHeader | MessageCode::InvalidClientId => 400,
            _ => 500,
        }
    }

    pub fn is_informational(self) -> bool {
        self.as_str().ends_with('I')
    }

    pub fn message(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (MessageCode::AlreadyLiked, Locale::En) => "Already liked.",
            (MessageCode::AlreadyLiked, Locale::Ja) => "すでにお気に入り登録済みです。",
            (MessageCode::InvalidHeader, Locale::En) => "header parameter is invalid.",
            (MessageCode::InvalidHeader, Locale::Ja) => {
                "ヘッダーチェック処理にてエラーが発生しました。"
            }
            (MessageCode::InvalidClientId, Locale::En) => "ClientID parameter is invalid.",
            (MessageCode::InvalidClientId, Locale::Ja) => {
                "クライアントIDチェック処理にてエラーが発生しました。"
            }
            (MessageCode::SelectFailed, Locale::En) => "DB select error.",
            (MessageCode::SelectFailed, Locale::Ja) => "DBへのデータ取得時にエラーが発生しました。",
            (MessageCode::MappingFailed, Locale::En) => "object mapping error.",
            (MessageCode::MappingFailed, Locale::Ja) => "オブジェクトの変換に失敗しました。",
            (MessageCode::UpdateFailed, Locale::En) => "DB update error.",
            (MessageCode::UpdateFailed, Locale::Ja) => "DBへのデータ保存時にエラーが発生しました。",
            (MessageCode::FavoriteCreateFailed, Locale::En) => "favorite create error.",
            (MessageCode::FavoriteCreateFailed, Locale::Ja) => {
                "お気に入りの登録時にエラーが発生しました。"
            }
            (MessageCode::FavoriteDeleteFailed, Locale::En) => "favorite delete error.",
            (MessageCode::FavoriteDeleteFailed, Locale::Ja) => {
                "お気に入りの解除時にエラーが発生しました。"
            }
        }
    }
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON body returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Code returned in place of private errors.
pub const INTERNAL_ERROR_CODE: &str = "internal_error";

/// A service failure tagged with its business code.
#[derive(Debug, thiserror::Error)]
#[error("[{code}] {}", .code.message(Locale::En))]
pub struct AppError {
    pub code: MessageCode,
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    pub fn new(code: MessageCode, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            code,
            source: Some(source.into()),
        }
    }

    /// An error with no underlying cause (informational codes).
    pub fn bare(code: MessageCode) -> Self {
        Self { code, source: None }
    }

    pub fn status(&self) -> u16 {
        self.code.status()
    }

    /// 4xx and informational codes are shown to callers as-is.
    pub fn is_public(&self) -> bool {
        self.status() < 500
    }

    pub fn message(&self, locale: Locale) -> &'static str {
        self.code.message(locale)
    }

    /// Status and body for the caller; private errors are logged here and
    /// replaced by a generic body.
    pub fn response(&self, locale: Locale) -> (u16, ErrorBody) {
        if self.is_public() {
            return (
                self.status(),
                ErrorBody {
                    code: self.code.as_str().to_string(),
                    message: self.message(locale).to_string(),
                },
            );
        }

        match &self.source {
            Some(source) => tracing::error!(
                error_code = %self.code,
                origin_error = %source,
                "business logic error"
            ),
            None => tracing::error!(error_code = %self.code, "business logic error"),
        }
        (
            500,
            ErrorBody {
                code: INTERNAL_ERROR_CODE.to_string(),
                message: "internal server error".to_string(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn codes_round_trip_through_parse() {
        for code in MessageCode::ALL {
            assert_eq!(MessageCode::parse(code.as_str()), Some(*code));
        }
        assert_eq!(MessageCode::parse("99999E"), None);
    }

    #[test]
    fn status_and_visibility() {
        assert_eq!(MessageCode::AlreadyLiked.status(), 200);
        assert!(MessageCode::AlreadyLiked.is_informational());
        assert_eq!(MessageCode::InvalidClientId.status(), 400);
        assert!(AppError::bare(MessageCode::InvalidHeader).is_public());
        assert!(!AppError::bare(MessageCode::UpdateFailed).is_public());
    }

    #[test]
    fn locales_fall_back_to_english() {
        assert_eq!(Locale::parse("JA"), Locale::Ja);
        assert_eq!(Locale::parse("fr"), Locale::En);
        assert_eq!(
            MessageCode::AlreadyLiked.message(Locale::Ja),
            "すでにお気に入り登録済みです。"
        );
    }

    #[test]
    fn private_errors_hide_detail() {
        let err = AppError::new(
            MessageCode::SelectFailed,
            StoreError::Connection("password authentication failed".into()),
        );
        let (status, body) = err.response(Locale::En);
        assert_eq!(status, 500);
        assert_eq!(body.code, INTERNAL_ERROR_CODE);
        assert!(!body.message.contains("password"));
        assert!(err.to_string().starts_with("[10001E]"));
        assert!(err.source.is_some());
    }

    #[test]
    fn public_errors_carry_code_and_message() {
        let (status, body) = AppError::bare(MessageCode::AlreadyLiked).response(Locale::En);
        assert_eq!(status, 200);
        assert_eq!(
            body,
            ErrorBody {
                code: "00001I".into(),
                message: "Already liked.".into()
            }
        );
    }
}
