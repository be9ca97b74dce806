use super::super::storage::StorageError;
use super::super::traits::MarketError;
use shared::freight::{CommandError, CommandErrorCode};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Market(MarketError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ManagerError {
    /// Domain error carried by this failure, if any
    pub fn market(&self) -> Option<&MarketError> {
        match self {
            ManagerError::Market(err) => Some(err),
            _ => None,
        }
    }
}

/// 将存储错误转换为错误码（前端负责本地化）
fn classify_storage_error(e: &StorageError) -> CommandErrorCode {
    // 先按枚举变体精确匹配
    match e {
        StorageError::Serialization(_) | StorageError::CounterOverflow(_) => {
            return CommandErrorCode::InternalError;
        }
        _ => {}
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();

    // 磁盘空间不足
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return CommandErrorCode::StorageFull;
    }

    // 内存不足
    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return CommandErrorCode::OutOfMemory;
    }

    // 数据损坏
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return CommandErrorCode::StorageCorrupted;
    }

    // 默认：系统繁忙（redb 的 Database/Transaction/Table/Storage/Commit 错误）
    CommandErrorCode::SystemBusy
}

fn not_found_code(entity: &str) -> CommandErrorCode {
    match entity {
        "Request" => CommandErrorCode::RequestNotFound,
        "Offer" => CommandErrorCode::OfferNotFound,
        "Container" => CommandErrorCode::ContainerNotFound,
        "Cargo" | "ContainerCargo" => CommandErrorCode::CargoNotFound,
        _ => CommandErrorCode::InternalError,
    }
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        let (code, message) = match err {
            ManagerError::Storage(e) => {
                let code = classify_storage_error(&e);
                let message = e.to_string(); // 保留技术细节用于日志/调试
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                (code, message)
            }
            ManagerError::Market(e) => {
                let message = e.to_string();
                let code = match e {
                    MarketError::NotFound { entity, .. } => not_found_code(entity),
                    MarketError::Forbidden(_) => CommandErrorCode::Forbidden,
                    MarketError::InvalidState(_) => CommandErrorCode::InvalidState,
                    MarketError::AlreadyClosed(_) => CommandErrorCode::AlreadyClosed,
                    MarketError::CapacityExceeded { .. } => CommandErrorCode::CapacityExceeded,
                    MarketError::DuplicateBid { .. } => CommandErrorCode::DuplicateBid,
                    MarketError::Validation(_) => CommandErrorCode::ValidationFailed,
                    // 已在解析器内以 error 级别记录，这里不暴露细节
                    MarketError::ChainCorrupted { .. } => {
                        return CommandError::new(
                            CommandErrorCode::ChainCorrupted,
                            "Internal data integrity error",
                        );
                    }
                    MarketError::Storage(e) => {
                        return ManagerError::Storage(e).into();
                    }
                };
                (code, message)
            }
            ManagerError::Internal(msg) => (CommandErrorCode::InternalError, msg),
        };
        CommandError::new(code, message)
    }
}

impl From<MarketError> for ManagerError {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::Storage(e) => ManagerError::Storage(e),
            other => ManagerError::Market(other),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_domain_errors_keep_distinct_codes() {
        let not_found: CommandError = ManagerError::from(MarketError::not_found("Offer", 7)).into();
        assert_eq!(not_found.code, CommandErrorCode::OfferNotFound);

        let forbidden: CommandError =
            ManagerError::from(MarketError::Forbidden("not yours".to_string())).into();
        assert_eq!(forbidden.code, CommandErrorCode::Forbidden);
        assert_ne!(
            not_found.code.error_code().http_status(),
            forbidden.code.error_code().http_status()
        );

        let capacity: CommandError = ManagerError::from(MarketError::CapacityExceeded {
            requested: Decimal::from(20),
            available: Decimal::from(16),
        })
        .into();
        assert_eq!(capacity.code, CommandErrorCode::CapacityExceeded);
        assert!(capacity.message.contains("16"));
    }

    #[test]
    fn test_chain_corruption_is_opaque() {
        let err: CommandError = ManagerError::from(MarketError::ChainCorrupted {
            request_id: 3,
            depth: 64,
        })
        .into();
        assert_eq!(err.code, CommandErrorCode::ChainCorrupted);
        assert!(!err.message.contains("64"));
    }
}
