pub mod dominant_emotion;
pub mod expression_detector;
pub mod expression_smoother;
pub mod expression_vector;
