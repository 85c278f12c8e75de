//! The static error taxonomy: one row of fixed metadata per error type.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    #[serde(rename = "AUTHENTICATION_ERROR")]
    Authentication,
    #[serde(rename = "AUTHORIZATION_ERROR")]
    Authorization,
    #[serde(rename = "NOT_FOUND_ERROR")]
    NotFound,
    #[serde(rename = "RATE_LIMIT_ERROR")]
    RateLimit,
    #[serde(rename = "PARAMETER_ERROR")]
    Parameter,
    #[serde(rename = "CORPUS_ERROR")]
    Corpus,
    #[serde(rename = "PROCESSING_ERROR")]
    Processing,
    #[serde(rename = "TIMEOUT_ERROR")]
    Timeout,
    #[serde(rename = "RESOURCE_ERROR")]
    Resource,
    #[serde(rename = "CONFIGURATION_ERROR")]
    Configuration,
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalService,
    #[serde(rename = "UNKNOWN_ERROR")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Client,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Fixed metadata for one error type.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub status_code: u16,
    pub category: Category,
    pub severity: Severity,
    pub recoverable: bool,
    pub description: &'static str,
}

impl ErrorType {
    pub const ALL: [ErrorType; 13] = [
        ErrorType::Validation,
        ErrorType::Authentication,
        ErrorType::Authorization,
        ErrorType::NotFound,
        ErrorType::RateLimit,
        ErrorType::Parameter,
        ErrorType::Corpus,
        ErrorType::Processing,
        ErrorType::Timeout,
        ErrorType::Resource,
        ErrorType::Configuration,
        ErrorType::ExternalService,
        ErrorType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Validation => "VALIDATION_ERROR",
            ErrorType::Authentication => "AUTHENTICATION_ERROR",
            ErrorType::Authorization => "AUTHORIZATION_ERROR",
            ErrorType::NotFound => "NOT_FOUND_ERROR",
            ErrorType::RateLimit => "RATE_LIMIT_ERROR",
            ErrorType::Parameter => "PARAMETER_ERROR",
            ErrorType::Corpus => "CORPUS_ERROR",
            ErrorType::Processing => "PROCESSING_ERROR",
            ErrorType::Timeout => "TIMEOUT_ERROR",
            ErrorType::Resource => "RESOURCE_ERROR",
            ErrorType::Configuration => "CONFIGURATION_ERROR",
            ErrorType::ExternalService => "EXTERNAL_SERVICE_ERROR",
            ErrorType::Unknown => "UNKNOWN_ERROR",
        }
    }

    pub fn info(&self) -> TypeInfo {
        use Category::*;
        use Severity::*;
        let (status_code, category, severity, recoverable, description) = match self {
            ErrorType::Validation => (400, Client, Medium, true, "Request validation failed"),
            ErrorType::Authentication => (401, Client, Medium, false, "Authentication required"),
            ErrorType::Authorization => (403, Client, Medium, false, "Access denied"),
            ErrorType::NotFound => (404, Client, Low, false, "Resource not found"),
            ErrorType::RateLimit => (429, Client, Medium, true, "Rate limit exceeded"),
            ErrorType::Parameter => (400, Client, Medium, true, "Invalid or missing parameter"),
            ErrorType::Corpus => (503, Server, High, true, "Corpus access failed"),
            ErrorType::Processing => (500, Server, High, true, "Content processing failed"),
            ErrorType::Timeout => (408, Server, Medium, true, "Operation timed out"),
            ErrorType::Resource => (507, Server, High, false, "Resource limits exhausted"),
            ErrorType::Configuration => (500, Server, Critical, false, "Server misconfigured"),
            ErrorType::ExternalService => {
                (502, Server, High, true, "External service unavailable")
            }
            ErrorType::Unknown => (500, Server, High, false, "Unexpected error"),
        };
        TypeInfo {
            status_code,
            category,
            severity,
            recoverable,
            description,
        }
    }

    /// Actionable advice shown alongside every error of this type.
    pub fn suggestions(&self) -> &'static [&'static str] {
        match self {
            ErrorType::Validation => &[
                "Check the request against /api/zpt/options",
                "Use one of the listed valid values",
            ],
            ErrorType::Authentication => {
                &["Provide a valid bearer token in the Authorization header"]
            }
            ErrorType::Authorization => &["Verify that you have access to this resource"],
            ErrorType::NotFound => &[
                "Verify the identifier or path",
                "Use inspect or recall to list existing items",
            ],
            ErrorType::RateLimit => &["Wait before retrying", "Reduce request frequency"],
            ErrorType::Parameter => &[
                "Check required parameters and their types",
                "See /api/zpt/schema for parameter definitions",
            ],
            ErrorType::Corpus => &[
                "Retry shortly",
                "Add content with tell or remember before navigating",
            ],
            ErrorType::Processing => &[
                "Reduce maxTokens or switch chunkStrategy",
                "Retry with a simpler query",
            ],
            ErrorType::Timeout => &[
                "Retry the request",
                "Narrow the selection with pan filters",
            ],
            ErrorType::Resource => &[
                "Reduce maxTokens",
                "Forget or fade memories that are no longer needed",
            ],
            ErrorType::Configuration => {
                &["The server configuration is incomplete; contact the operator"]
            }
            ErrorType::ExternalService => &[
                "Retry later",
                "Check the status of the configured provider",
            ],
            ErrorType::Unknown => &[
                "Retry the request",
                "Report the error id if the problem persists",
            ],
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

