use serde::{Deserialize, Serialize};
use shared::error::AppError;
use std::str::FromStr;

macro_rules! define_id {
    ($id_type:ident, $label:literal) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $id_type(uuid::Uuid);

        impl $id_type {
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            pub fn raw(self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $id_type {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $id_type {
            fn from(value: uuid::Uuid) -> Self {
                Self(value)
            }
        }

        impl FromStr for $id_type {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self).map_err(|_| {
                    AppError::ConversionEntityError(format!("invalid {} id: {s}", $label))
                })
            }
        }

        impl std::fmt::Display for $id_type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

define_id!(EventId, "event");
define_id!(NotificationId, "notification");

/// プロバイダープレフィックス付きのユーザー ID（例: `line:U123...`）。
///
/// `<provider>:<subject>` の形のみを有効とし、それ以外の文字列
/// （過去に紛れ込んだダミー値や表示名そのままの値）は不正データとして扱う。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// `:` より前のプロバイダー名
    pub fn provider(&self) -> &str {
        // コンストラクタで形を保証済み
        self.0.split_once(':').map(|(p, _)| p).unwrap_or("")
    }

    /// `:` より後のプロバイダー内 ID
    pub fn subject(&self) -> &str {
        self.0.split_once(':').map(|(_, s)| s).unwrap_or("")
    }

    /// LINE の push 送信先に使う生のユーザー ID（`line:` を外したもの）。
    /// LINE 以外のプロバイダーには送れないので None。
    pub fn line_user_id(&self) -> Option<&str> {
        (self.provider() == "line").then(|| self.subject())
    }
}

/// シード投入時代のダミー値（`dummy-user` など）かどうか
pub fn is_placeholder(raw: &str) -> bool {
    raw.trim().to_ascii_lowercase().starts_with("dummy")
}

impl TryFrom<String> for UserId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl FromStr for UserId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let valid = trimmed
            .split_once(':')
            .map(|(provider, subject)| {
                !provider.is_empty()
                    && provider.bytes().all(|b| b.is_ascii_lowercase())
                    && !subject.is_empty()
            })
            .unwrap_or(false);
        if valid && !is_placeholder(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(AppError::InvalidUserId(format!(
                "user id must look like \"<provider>:<subject>\", got: {s}"
            )))
        }
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_provider_tagged_shape() {
        let id: UserId = "line:U1234567890".parse().unwrap();
        assert_eq!(id.provider(), "line");
        assert_eq!(id.subject(), "U1234567890");
        assert_eq!(id.line_user_id(), Some("U1234567890"));
    }

    #[test]
    fn user_id_trims_surrounding_whitespace() {
        let id: UserId = "  line:U1  ".parse().unwrap();
        assert_eq!(id.as_str(), "line:U1");
    }

    #[test]
    fn user_id_rejects_untagged_and_malformed_values() {
        for raw in ["", "   ", "U12345", "山田太郎", "line:", ":U1", "LINE:U1"] {
            assert!(raw.parse::<UserId>().is_err(), "should reject {raw:?}");
        }
    }

    #[test]
    fn user_id_rejects_seed_placeholders() {
        for raw in ["dummy-user", "dummy_user", "Dummy User", "dummy:x"] {
            assert!(is_placeholder(raw), "should detect {raw:?}");
            assert!(raw.parse::<UserId>().is_err());
        }
    }

    #[test]
    fn non_line_provider_has_no_push_target() {
        let id: UserId = "google:abc".parse().unwrap();
        assert_eq!(id.line_user_id(), None);
    }
}
