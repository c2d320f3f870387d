//! Types shared between the job console and anything else that speaks the
//! jobs API: the job lifecycle model, the tool descriptor table and the wire
//! payloads exchanged with the backend.

pub mod jobs;
pub mod model;
pub mod requests;
