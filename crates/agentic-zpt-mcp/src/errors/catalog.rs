//! Error code catalog. Numeric ranges: 4000 validation, 4100 parameter,
//! 4200 not found, 4300 auth, 4400 rate limit, 5000 corpus, 5100
//! processing, 5200 resources, 5300 configuration, 5400 external
//! services, 5500 timeouts.

use serde::Serialize;

use super::taxonomy::ErrorType;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub code: &'static str,
    pub number: u16,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub message: &'static str,
}

const fn entry(
    code: &'static str,
    number: u16,
    error_type: ErrorType,
    message: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        code,
        number,
        error_type,
        message,
    }
}

use ErrorType::*;

static CATALOG: &[CatalogEntry] = &[
    entry("INVALID_ZOOM_LEVEL", 4001, Validation, "Zoom level is not one of the supported values"),
    entry("INVALID_TILT_REPRESENTATION", 4002, Validation, "Tilt style is not one of the supported values"),
    entry("INVALID_PAN_FILTER", 4003, Validation, "Pan filter is malformed"),
    entry("INVALID_TRANSFORM_OPTIONS", 4004, Validation, "Transform options are out of range"),
    entry("INVALID_QUERY", 4005, Validation, "Query is empty or malformed"),
    entry("UNSUPPORTED_VERB", 4006, Validation, "Verb is not supported"),
    entry("REQUEST_VALIDATION_FAILED", 4007, Validation, "Request failed structural validation"),
    entry("INVALID_JSON_BODY", 4008, Validation, "Request body is not valid JSON"),
    entry("INVALID_MULTIPART_BODY", 4009, Validation, "Multipart body is malformed"),
    entry("MISSING_MULTIPART_BOUNDARY", 4010, Validation, "Multipart content type has no boundary"),
    entry("INVALID_BODY_ENCODING", 4011, Validation, "Request body is not valid UTF-8"),
    entry("REQUEST_TOO_LARGE", 4012, Validation, "Request body exceeds the size limit"),
    entry("PARAMETER_VALIDATION_FAILED", 4101, Parameter, "Parameter failed validation"),
    entry("MISSING_REQUIRED_PARAMETER", 4102, Parameter, "Required parameter is missing"),
    entry("PARAMETER_OUT_OF_RANGE", 4103, Parameter, "Parameter is outside its allowed range"),
    entry("INVALID_PARAMETER_TYPE", 4104, Parameter, "Parameter has the wrong type"),
    entry("INVALID_ARGUMENTS", 4105, Parameter, "Arguments must be a JSON object"),
    entry("MEMORY_ITEM_NOT_FOUND", 4201, NotFound, "Memory item does not exist"),
    entry("PROJECT_CONTEXT_NOT_FOUND", 4202, NotFound, "Project context does not exist"),
    entry("SESSION_NOT_FOUND", 4203, NotFound, "Session does not exist"),
    entry("ROUTE_NOT_FOUND", 4204, NotFound, "No handler for this route or method"),
    entry("AUTHENTICATION_REQUIRED", 4301, Authentication, "Missing or invalid credentials"),
    entry("INVALID_TOKEN", 4302, Authentication, "Bearer token was rejected"),
    entry("ACCESS_DENIED", 4303, Authorization, "Caller may not perform this operation"),
    entry("RATE_LIMIT_EXCEEDED", 4401, RateLimit, "Too many requests"),
    entry("CORPUS_UNAVAILABLE", 5001, Corpus, "Corpus cannot be reached"),
    entry("SPARQL_QUERY_FAILED", 5002, Corpus, "Selection query failed"),
    entry("CORPUS_EMPTY", 5003, Corpus, "Corpus holds no content"),
    entry("SELECTION_FAILED", 5004, Corpus, "Corpuscle selection failed"),
    entry("NO_RECENT_INTERACTIONS", 5005, Corpus, "No recent interactions to derive a topic from"),
    entry("PROCESSING_FAILED", 5101, Processing, "Content processing failed"),
    entry("TRANSFORMATION_FAILED", 5102, Processing, "Content transformation failed"),
    entry("EMBEDDING_GENERATION_FAILED", 5103, Processing, "Embedding could not be generated"),
    entry("CONCEPT_EXTRACTION_FAILED", 5104, Processing, "Concepts could not be extracted"),
    entry("LLM_RESPONSE_INVALID", 5105, Processing, "Generated reply could not be parsed"),
    entry("FORMATTING_ERROR", 5106, Processing, "Response could not be formatted"),
    entry("CHUNKING_FAILED", 5107, Processing, "Content could not be chunked"),
    entry("MEMORY_LIMIT_EXCEEDED", 5201, Resource, "Memory limit exceeded"),
    entry("TOKEN_LIMIT_EXCEEDED", 5202, Resource, "Token budget exceeded"),
    entry("STORAGE_FULL", 5203, Resource, "Storage capacity exhausted"),
    entry("CONFIGURATION_MISSING", 5301, Configuration, "Required configuration is missing"),
    entry("INVALID_CONFIGURATION", 5302, Configuration, "Configuration is invalid"),
    entry("PROVIDER_NOT_CONFIGURED", 5303, Configuration, "Required provider is not configured"),
    entry("EXTERNAL_SERVICE_UNAVAILABLE", 5401, ExternalService, "External service is unavailable"),
    entry("LLM_PROVIDER_ERROR", 5402, ExternalService, "Text generation provider failed"),
    entry("EMBEDDING_PROVIDER_ERROR", 5403, ExternalService, "Embedding provider failed"),
    entry("OPERATION_TIMEOUT", 5501, Timeout, "Operation timed out"),
    entry("REQUEST_TIMEOUT", 5502, Timeout, "Request body was not received in time"),
    entry("GENERATION_TIMEOUT", 5503, Timeout, "Text generation timed out"),
];

pub fn lookup(code: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.code == code)
}

pub fn entries() -> &'static [CatalogEntry] {
    CATALOG
}
