//! Integration-test member; all content lives under `tests/`.
