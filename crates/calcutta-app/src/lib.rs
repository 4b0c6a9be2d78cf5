// Library root: configuration, CSV ingest/export, and the run pipeline around
// the calcutta-core engine. The `calcutta` binary is a thin wrapper over
// `pipeline::run`.

pub mod config;
pub mod export;
pub mod ingest;
pub mod pipeline;
