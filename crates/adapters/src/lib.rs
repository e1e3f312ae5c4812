pub mod dns;
pub mod ebpf;
pub mod http;
pub mod storage;
