//! Per-debt follow-up work: idempotence guards, fan-out, artifact generation

pub mod fanout;
pub mod generators;
pub mod guards;
