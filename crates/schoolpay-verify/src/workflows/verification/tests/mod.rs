mod common;
mod triage;
