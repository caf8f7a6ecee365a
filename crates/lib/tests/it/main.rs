/*! Integration tests for idcache.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - backend: Tests for the InMemory engine and its file persistence
 * - config: Tests for loading configuration files
 * - identity: Tests for user, group, membership and legacy verbs on SysDb
 * - queue: Tests for the request serializer (admission, FIFO, commit/rollback)
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("idcache=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod backend;
mod config;
mod helpers;
mod identity;
mod queue;
