mod blazeface;
pub mod onnx_expression_detector;
