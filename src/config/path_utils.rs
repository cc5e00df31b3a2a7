//! 路径工具模块
//!
//! 提供路径处理相关的工具函数，包括 tilde (~) 路径展开

use std::path::{Path, PathBuf};

/// 展开路径中的 tilde (~) 为用户主目录
///
/// 支持以下格式：
/// - `~` -> 用户主目录
/// - `~/path` -> 用户主目录/path
/// - 其他路径 -> 返回原路径
pub fn expand_tilde<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    if !path_str.starts_with('~') {
        return path.to_path_buf();
    }

    let home_dir = match dirs::home_dir() {
        Some(dir) => dir,
        None => return path.to_path_buf(),
    };

    if path_str == "~" {
        home_dir
    } else if let Some(rest) = path_str.strip_prefix("~/") {
        home_dir.join(rest)
    } else {
        // ~user/path 格式不支持，返回原路径
        path.to_path_buf()
    }
}
