//! Integration tests for `jugl-net` live in `tests/`.
