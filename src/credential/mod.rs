//! 凭证模块
//!
//! 定义附加到报告流请求上的凭证：组织范围加一种认证方式。
//! 凭证只在请求头构造时被读取，日志与调试输出一律脱敏。
//!
//! # 需求覆盖
//!
//! - 需求 4.1: 请求携带 Authorization 与组织范围头

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 组织范围请求头名称
pub const ORGANIZATION_HEADER: &str = "X-Organization";

/// 认证方式
///
/// 根据认证方式不同，Authorization 头的值形式不同。
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMethod {
    /// OAuth 访问令牌（Bearer）
    Bearer { token: String },
    /// Azure DevOps 个人访问令牌（PAT，以空用户名做 Basic 认证）
    Pat { token: String },
}

/// 报告流请求凭证
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// 组织名（租户范围）
    organization: String,
    /// 认证方式
    auth: AuthMethod,
}

impl Credentials {
    /// 使用 OAuth 访问令牌创建凭证
    pub fn bearer(organization: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            auth: AuthMethod::Bearer {
                token: token.into(),
            },
        }
    }

    /// 使用个人访问令牌创建凭证
    pub fn pat(organization: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            auth: AuthMethod::Pat {
                token: token.into(),
            },
        }
    }

    /// 组织名
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// `Authorization` 请求头的值
    pub fn authorization_header(&self) -> String {
        match &self.auth {
            AuthMethod::Bearer { token } => format!("Bearer {}", token),
            AuthMethod::Pat { token } => {
                let encoded =
                    base64::engine::general_purpose::STANDARD.encode(format!(":{}", token));
                format!("Basic {}", encoded)
            }
        }
    }

    /// 获取凭证的显示名称（隐藏敏感信息）
    pub fn display_name(&self) -> String {
        let token = match &self.auth {
            AuthMethod::Bearer { token } | AuthMethod::Pat { token } => token,
        };
        let prefix: String = token.chars().take(6).collect();
        if token.chars().count() > 6 {
            format!("{}***@{}", prefix, self.organization)
        } else {
            format!("***@{}", self.organization)
        }
    }
}

// 凭证绝不以明文进入日志
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("organization", &self.organization)
            .field("auth", &"***")
            .finish()
    }
}

// ============================================================================
// 测试模块
// ============================================================================
