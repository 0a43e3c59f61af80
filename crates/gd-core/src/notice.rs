//! Transient, dismissible messages shown to the visitor or the admin.

use serde::Serialize;

use crate::error::DossierError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

impl From<&DossierError> for Notice {
    fn from(err: &DossierError) -> Self {
        match err {
            DossierError::Validation(_) => {
                Notice::error("Пожалуйста, заполните обязательные поля")
            }
            DossierError::InvalidIp(_) => Notice::error("Введите корректный IP-адрес"),
            DossierError::AlreadyBlacklisted(_) => Notice::warning("IP уже в черном списке"),
            DossierError::AttachmentRead { name, .. } => {
                Notice::error(format!("Не удалось прочитать файл {name}"))
            }
            DossierError::Conflict(_) => {
                Notice::warning("Данные изменились в другой вкладке, попробуйте еще раз")
            }
            DossierError::Storage(_)
            | DossierError::Serialization(_)
            | DossierError::Internal(_) => Notice::error("Не удалось сохранить данные"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_blacklist_entry_is_a_warning() {
        let notice = Notice::from(&DossierError::AlreadyBlacklisted("1.2.3.4".into()));
        assert_eq!(notice.level, NoticeLevel::Warning);
    }

    #[test]
    fn attachment_failure_names_the_file() {
        let notice = Notice::from(&DossierError::AttachmentRead {
            name: "scan.pdf".into(),
            reason: "gone".into(),
        });
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.contains("scan.pdf"));
    }
}
