pub mod clock;
pub mod discount;
pub mod http;
pub mod onnx;
