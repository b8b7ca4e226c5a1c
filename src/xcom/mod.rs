pub mod client;
pub mod datapoint;
pub mod packet;
pub mod tcp;
pub mod transport;
pub mod udp;
pub mod value;
