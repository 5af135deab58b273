pub mod bus;
pub mod decode;
pub mod engine;
pub mod model;
pub mod storage;
