// Test modules for llm-council
//
// Each source module has a corresponding test file focused on the
// behaviour callers rely on. HTTP-level tests live in the crate's tests/
// directory and run against wiremock servers.

// Test helper utilities
pub mod helpers;
