/// Host-level capabilities shared by FabLink's operational tooling: running
/// commands on the host, probing the OS release, and driving the service
/// manager. Everything that touches the host goes through the [`runner`]
/// seam so that callers can be exercised against a recording fake.
pub mod os_release;
pub mod runner;
pub mod service;
